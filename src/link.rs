//! Bytecode-level library linking
//!
//! A contract that depends on an external library is compiled with a
//! 40-character `__LibraryName…` placeholder wherever the library address
//! belongs. Linking substitutes the deployed address for the placeholder;
//! bytecode with any placeholder left in it cannot be submitted.

use ethers::abi::Address;

use crate::{constants::LINK_PLACEHOLDER_LEN, errors::ScriptError};

/// Returns the placeholder the compiler leaves in bytecode for the library
pub fn link_placeholder(library: &str) -> String {
    let mut placeholder = format!("__{library}");
    placeholder.truncate(LINK_PLACEHOLDER_LEN);
    while placeholder.len() < LINK_PLACEHOLDER_LEN {
        placeholder.push('_');
    }
    placeholder
}

/// Substitutes the library's deployed address for its placeholder
pub fn link_bytecode(
    bytecode: &str,
    library: &str,
    address: Address,
) -> Result<String, ScriptError> {
    let placeholder = link_placeholder(library);
    if !bytecode.contains(&placeholder) {
        return Err(ScriptError::LinkFailure(format!(
            "no link reference to {library} in bytecode"
        )));
    }

    Ok(bytecode.replace(&placeholder, &format!("{address:x}")))
}

/// Checks that no unlinked placeholder remains in the bytecode
pub fn ensure_fully_linked(contract: &str, bytecode: &str) -> Result<(), ScriptError> {
    if bytecode.contains("__") {
        return Err(ScriptError::LinkFailure(format!(
            "{contract} bytecode still contains unlinked library references"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ethers::abi::Address;

    use super::{ensure_fully_linked, link_bytecode, link_placeholder};
    use crate::{constants::LINK_PLACEHOLDER_LEN, errors::ScriptError};

    #[test]
    fn test_placeholder_is_forty_chars() {
        let placeholder = link_placeholder("Errors");
        assert_eq!(placeholder.len(), LINK_PLACEHOLDER_LEN);
        assert_eq!(placeholder, format!("__Errors{}", "_".repeat(32)));
    }

    #[test]
    fn test_placeholder_truncates_long_names() {
        let placeholder = link_placeholder(&"A".repeat(64));
        assert_eq!(placeholder.len(), LINK_PLACEHOLDER_LEN);
        assert!(placeholder.starts_with("__A"));
    }

    #[test]
    fn test_link_substitutes_address() {
        let address = Address::from_low_u64_be(0xABCD);
        let bytecode = format!("0x6080{}6040", link_placeholder("ValidateLogic"));

        let linked = link_bytecode(&bytecode, "ValidateLogic", address).unwrap();
        assert!(linked.contains(&format!("{address:x}")));
        ensure_fully_linked("CCALMainChain", &linked).unwrap();
    }

    #[test]
    fn test_link_without_reference_fails() {
        let result = link_bytecode("0x60806040", "Errors", Address::zero());
        assert!(matches!(result, Err(ScriptError::LinkFailure(_))));
    }

    #[test]
    fn test_unlinked_bytecode_is_detected() {
        let bytecode = format!("0x6080{}6040", link_placeholder("Errors"));
        assert!(matches!(
            ensure_fully_linked("CCALMainChain", &bytecode),
            Err(ScriptError::LinkFailure(_)),
        ));
    }
}
