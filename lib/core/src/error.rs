//! Error handling foundation for gatehouse.
//!
//! Only the `Result` alias lives here. Each crate defines its own error
//! enums and wraps them in a rootcause `Report` as they cross layers.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Unavailable;

    impl std::fmt::Display for Unavailable {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "store unavailable")
        }
    }

    impl std::error::Error for Unavailable {}

    fn load(fail: bool) -> Result<&'static str, Unavailable> {
        if fail {
            Err(Unavailable)?;
        }
        Ok("/secret")
    }

    #[test]
    fn result_type_works() {
        let ok: Result<&str> = Ok("/secret");
        assert_eq!(ok.expect("should be ok"), "/secret");
    }

    #[test]
    fn context_errors_convert_into_reports() {
        assert_eq!(load(false).expect("should be ok"), "/secret");

        let report = load(true).expect_err("should fail");
        assert_eq!(report.current_context(), &Unavailable);
    }
}
