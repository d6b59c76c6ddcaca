pub mod work;

/// Body written when the unit of work succeeds (implicit 200).
pub const SUCCESS_BODY: &str = ":-)";

/// Body written with the 400 when the unit of work fails.
pub const ERROR_BODY: &str = "Nope";
