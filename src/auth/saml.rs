//! SAML assertion decoding and role extraction

use super::types::{AuthError, AuthResult, RoleGrant, ROLE_ATTRIBUTE_NAME};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

/// Marker preceding the assertion value in the federation app's SSO page
const SAML_RESPONSE_MARKER: &str = r#"name="SAMLResponse" value=""#;

/// Decode a base64 SAML assertion and extract the role/provider pairs
/// carried by the well-known `Role` attribute.
///
/// Attribute values are comma-separated ARN pairs which may appear in
/// either order; the half containing `:role/` is taken as the role ARN.
/// Values that do not split into exactly two parts are skipped.
pub fn extract_roles(assertion: &str) -> AuthResult<Vec<RoleGrant>> {
    let decoded = STANDARD
        .decode(assertion)
        .map_err(|e| AuthError::Parse(format!("base64 decode failed: {e}")))?;
    let xml = String::from_utf8(decoded)
        .map_err(|e| AuthError::Parse(format!("assertion is not valid UTF-8: {e}")))?;

    let doc = roxmltree::Document::parse(&xml)
        .map_err(|e| AuthError::Parse(format!("XML parse failed: {e}")))?;

    let mut grants = Vec::new();
    for attribute in doc.descendants().filter(|n| {
        n.tag_name().name() == "Attribute" && n.attribute("Name") == Some(ROLE_ATTRIBUTE_NAME)
    }) {
        for value in attribute
            .children()
            .filter(|c| c.tag_name().name() == "AttributeValue")
        {
            let Some(text) = value.text() else {
                continue;
            };
            let parts: Vec<&str> = text.trim().split(',').collect();
            if parts.len() != 2 {
                debug!("skipping malformed role attribute value: {}", text.trim());
                continue;
            }
            // The pair may be listed role-first or provider-first
            let (role_arn, principal_arn) = if parts[0].contains(":role/") {
                (parts[0], parts[1])
            } else {
                (parts[1], parts[0])
            };
            grants.push(RoleGrant {
                role_arn: role_arn.to_string(),
                principal_arn: principal_arn.to_string(),
            });
        }
    }

    if grants.is_empty() {
        return Err(AuthError::NoRoles);
    }

    debug!("extracted {} role(s) from SAML assertion", grants.len());
    Ok(grants)
}

/// Pull the base64 assertion out of the SSO page HTML by locating the
/// hidden `SAMLResponse` form field.
pub fn extract_saml_from_html(html: &str) -> AuthResult<String> {
    let start = html
        .find(SAML_RESPONSE_MARKER)
        .ok_or_else(|| AuthError::Parse("SAMLResponse not found in HTML".to_string()))?
        + SAML_RESPONSE_MARKER.len();
    let end = html[start..]
        .find('"')
        .ok_or_else(|| AuthError::Parse("malformed SAMLResponse in HTML".to_string()))?;
    Ok(html[start..start + end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(xml: &str) -> String {
        STANDARD.encode(xml)
    }

    fn response_with_values(values: &[&str]) -> String {
        let attribute_values: String = values
            .iter()
            .map(|v| format!("<AttributeValue>{v}</AttributeValue>"))
            .collect();
        format!(
            r#"<Response xmlns="urn:oasis:names:tc:SAML:2.0:protocol">
  <Assertion>
    <AttributeStatement>
      <Attribute Name="https://aws.amazon.com/SAML/Attributes/Role">{attribute_values}</Attribute>
      <Attribute Name="https://aws.amazon.com/SAML/Attributes/SessionDuration">
        <AttributeValue>3600</AttributeValue>
      </Attribute>
    </AttributeStatement>
  </Assertion>
</Response>"#
        )
    }

    #[test]
    fn extracts_single_role_pair() {
        let assertion = encode(&response_with_values(&[
            "arn:aws:iam::1:role/X,arn:aws:iam::1:saml-provider/Y",
        ]));
        let grants = extract_roles(&assertion).unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].role_arn, "arn:aws:iam::1:role/X");
        assert_eq!(grants[0].principal_arn, "arn:aws:iam::1:saml-provider/Y");
    }

    #[test]
    fn assigns_role_arn_regardless_of_order() {
        let assertion = encode(&response_with_values(&[
            "arn:aws:iam::1:saml-provider/Y,arn:aws:iam::1:role/X",
            "arn:aws:iam::2:role/A,arn:aws:iam::2:saml-provider/B",
        ]));
        let grants = extract_roles(&assertion).unwrap();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].role_arn, "arn:aws:iam::1:role/X");
        assert_eq!(grants[0].principal_arn, "arn:aws:iam::1:saml-provider/Y");
        assert_eq!(grants[1].role_arn, "arn:aws:iam::2:role/A");
    }

    #[test]
    fn skips_values_that_do_not_split_into_two_parts() {
        let assertion = encode(&response_with_values(&[
            "arn:aws:iam::1:role/alone",
            "arn:aws:iam::1:role/X,arn:aws:iam::1:saml-provider/Y,extra",
            "arn:aws:iam::1:role/Z,arn:aws:iam::1:saml-provider/W",
        ]));
        let grants = extract_roles(&assertion).unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].role_arn, "arn:aws:iam::1:role/Z");
    }

    #[test]
    fn no_role_attribute_is_an_error() {
        let assertion = encode(
            r#"<Response><Assertion><AttributeStatement>
  <Attribute Name="https://aws.amazon.com/SAML/Attributes/SessionDuration">
    <AttributeValue>3600</AttributeValue>
  </Attribute>
</AttributeStatement></Assertion></Response>"#,
        );
        assert!(matches!(extract_roles(&assertion), Err(AuthError::NoRoles)));
    }

    #[test]
    fn all_values_malformed_is_an_error() {
        let assertion = encode(&response_with_values(&["not-an-arn-pair"]));
        assert!(matches!(extract_roles(&assertion), Err(AuthError::NoRoles)));
    }

    #[test]
    fn invalid_base64_is_a_parse_error() {
        assert!(matches!(
            extract_roles("%%%not-base64%%%"),
            Err(AuthError::Parse(_))
        ));
    }

    #[test]
    fn invalid_xml_is_a_parse_error() {
        let assertion = encode("<Response><unclosed>");
        assert!(matches!(
            extract_roles(&assertion),
            Err(AuthError::Parse(_))
        ));
    }

    #[test]
    fn finds_saml_response_in_html() {
        let html = r#"<html><body>
<form method="post" action="https://signin.aws.amazon.com/saml">
  <input type="hidden" name="SAMLResponse" value="UEsDBBQABg=="/>
</form></body></html>"#;
        assert_eq!(extract_saml_from_html(html).unwrap(), "UEsDBBQABg==");
    }

    #[test]
    fn missing_saml_response_marker_is_an_error() {
        assert!(matches!(
            extract_saml_from_html("<html><body>login</body></html>"),
            Err(AuthError::Parse(_))
        ));
    }

    #[test]
    fn unterminated_saml_response_value_is_an_error() {
        let html = r#"<input name="SAMLResponse" value="UEsDBBQABg=="#;
        assert!(matches!(
            extract_saml_from_html(html),
            Err(AuthError::Parse(_))
        ));
    }
}
