//! Resource URN parsing.

use crate::error::{ProviderError, Result};

/// Extracts the resource type token from a URN.
///
/// URNs look like `urn:pulumi:stack::project::qualified$type::name`, where
/// the qualified type lists parent types separated by `$`. The last
/// component is the resource's own type.
///
/// # Errors
///
/// Returns [`ProviderError::Internal`] when the URN does not have the
/// expected shape.
pub fn resource_type(urn: &str) -> Result<&str> {
    let malformed = || ProviderError::internal(format!("malformed resource URN {urn:?}"));
    if !urn.starts_with("urn:pulumi:") {
        return Err(malformed());
    }
    let qualified = urn.splitn(4, "::").nth(2).ok_or_else(malformed)?;
    qualified
        .rsplit('$')
        .next()
        .filter(|token| !token.is_empty())
        .ok_or_else(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_type() {
        let urn = "urn:pulumi:prod::infra::pulumiservice:index:StackTag::env";
        assert_eq!(resource_type(urn).ok(), Some("pulumiservice:index:StackTag"));
    }

    #[test]
    fn test_parented_type_uses_last_component() {
        let urn = "urn:pulumi:prod::infra::my:component:Stack$pulumiservice:index:Team::core";
        assert_eq!(resource_type(urn).ok(), Some("pulumiservice:index:Team"));
    }

    #[test]
    fn test_name_may_contain_separators() {
        let urn = "urn:pulumi:prod::infra::pulumiservice:index:Environment::a::b";
        assert_eq!(resource_type(urn).ok(), Some("pulumiservice:index:Environment"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(resource_type("pulumiservice:index:Team").is_err());
        assert!(resource_type("urn:pulumi:prod::infra").is_err());
    }
}
