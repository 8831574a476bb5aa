//! Required-field validation for resolved commands.
//!
//! The robot refuses to load a method whose sections leave certain fields
//! empty. Each opcode lists those fields in the opcode table
//! ([`crate::transform::opcodes`]); a parameter set is valid when every
//! listed field is present and non-empty.
//!
//! A set whose `Opcode` is not a known code has no list and is accepted
//! with a warning.
//!
//! # Example
//!
//! ```rust,ignore
//! use dwsgen::{defaults_for, is_valid};
//!
//! assert!(is_valid(&defaults_for("113")));   // Comment: nothing to fill in
//! assert!(!is_valid(&defaults_for("101")));  // SampleTransfer: no source yet
//! ```

use crate::api::logs::log_warning;
use crate::error::ValidationError;
use crate::models::{Opcode, ParameterSet, ResolvedCommand, RowOrigin};
use crate::transform::opcodes::required_fields_for;

/// Check a parameter set, reporting the first required field that is empty.
pub fn validate(params: &ParameterSet) -> Result<(), ValidationError> {
    let code = params.get("Opcode").unwrap_or("");
    let Some(required) = required_fields_for(code) else {
        log_warning(format!(
            "Opcode '{}' not recognized, accepting section without required-field check",
            code
        ));
        return Ok(());
    };

    match required
        .iter()
        .find(|field| params.get(field).map_or(true, str::is_empty))
    {
        Some(field) => Err(ValidationError::MissingField {
            opcode: code.to_string(),
            field: field.to_string(),
        }),
        None => Ok(()),
    }
}

/// `true` if [`validate`] passes.
pub fn is_valid(params: &ParameterSet) -> bool {
    validate(params).is_ok()
}

/// Validate a candidate and seal it into a [`ResolvedCommand`].
pub fn accept(
    opcode: Opcode,
    params: ParameterSet,
    origin: Option<RowOrigin>,
) -> Result<ResolvedCommand, ValidationError> {
    validate(&params)?;
    Ok(ResolvedCommand::new(opcode, params, origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::opcodes::defaults_for;

    fn filled_transfer() -> ParameterSet {
        let mut params = defaults_for("101");
        for (key, value) in [
            ("Source1", "Reservoir"),
            ("Source_Pat_Z1", "A"),
            ("Source_Pat_S1", "1"),
            ("Destination1", "PCR plate"),
            ("Destination_Pat_Z1", "B"),
            ("Destination_Pat_S1", "3"),
            ("TransferVolumenNanoliter", "20000"),
        ] {
            params.insert(key, value);
        }
        params
    }

    #[test]
    fn test_comment_default_is_valid() {
        assert!(is_valid(&defaults_for("113")));
    }

    #[test]
    fn test_transfer_default_is_invalid() {
        assert_eq!(
            validate(&defaults_for("101")),
            Err(ValidationError::MissingField {
                opcode: "101".into(),
                field: "Source1".into(),
            })
        );
    }

    #[test]
    fn test_filled_transfer_is_valid() {
        assert!(is_valid(&filled_transfer()));
    }

    #[test]
    fn test_missing_volume_reported() {
        let mut params = filled_transfer();
        params.insert("TransferVolumenNanoliter", "");
        assert_eq!(
            validate(&params),
            Err(ValidationError::MissingField {
                opcode: "101".into(),
                field: "TransferVolumenNanoliter".into(),
            })
        );
    }

    #[test]
    fn test_absent_field_is_invalid() {
        let params: ParameterSet = [("OpcodeStr", "Place it"), ("Opcode", "115")].into_iter().collect();
        assert!(!is_valid(&params));
    }

    #[test]
    fn test_first_failure_reported() {
        let mut params = defaults_for("115");
        params.insert("MatDatei", "./top/dws/trth/SAR_Rack_1_5ml");
        let err = validate(&params).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                opcode: "115".into(),
                field: "MatName".into(),
            }
        );
    }

    #[test]
    fn test_unknown_opcode_accepted() {
        let params: ParameterSet = [("OpcodeStr", "Centrifuge"), ("Opcode", "777")].into_iter().collect();
        assert!(is_valid(&params));

        let params: ParameterSet = [("Bezeichner", "no opcode at all")].into_iter().collect();
        assert!(is_valid(&params));
    }

    #[test]
    fn test_validation_is_repeatable() {
        let valid = filled_transfer();
        let before = valid.clone();
        assert_eq!(is_valid(&valid), is_valid(&valid));
        assert_eq!(valid, before);

        let invalid = defaults_for("101");
        assert_eq!(validate(&invalid), validate(&invalid));
    }

    #[test]
    fn test_accept_seals_command() {
        let origin = RowOrigin {
            source: "s.csv".into(),
            line: 3,
        };
        let cmd = accept(Opcode::Comment, defaults_for("113"), Some(origin.clone())).unwrap();
        assert_eq!(cmd.opcode(), Opcode::Comment);
        assert_eq!(cmd.origin(), Some(&origin));
        assert!(!cmd.is_trailer());

        assert!(accept(Opcode::SampleTransfer, defaults_for("101"), None).is_err());
    }
}
