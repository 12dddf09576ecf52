use utoipa::OpenApi;

use crate::api::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Reservas functions",
        description = "Payment capture, off-session charges, voucher redemption and operator provisioning"
    ),
    paths(
        handlers::capture::capture_payment,
        handlers::charge::charge_booking,
        handlers::vouchers::use_voucher_session,
        handlers::admin::create_admin,
        handlers::admin::elevate_admin,
    ),
    tags(
        (name = "Payments", description = "Capture and charge reservations"),
        (name = "Vouchers", description = "Session pack redemption"),
        (name = "Admin", description = "Operator accounts"),
    )
)]
pub struct ApiDoc;
