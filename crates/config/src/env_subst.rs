/// Replace `${ENV_VAR}` placeholders in a raw config string.
///
/// Credentials are the usual occupants: `password = "${IG_PASSWORD}"`.
/// Unset or malformed placeholders are left untouched so the error
/// surfaces at the point of use, not silently as an empty string.
pub fn substitute_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            _ => {
                // No closing brace (or empty name) — emit literally.
                out.push_str("${");
                rest = after;
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(unsafe_code)]
    fn substitutes_known_var() {
        unsafe { std::env::set_var("MEGAPHONE_TEST_VAR", "hunter2") };
        assert_eq!(
            substitute_env("password = \"${MEGAPHONE_TEST_VAR}\""),
            "password = \"hunter2\""
        );
        unsafe { std::env::remove_var("MEGAPHONE_TEST_VAR") };
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env("${MEGAPHONE_NO_SUCH_VAR_XYZ}"),
            "${MEGAPHONE_NO_SUCH_VAR_XYZ}"
        );
    }

    #[test]
    fn leaves_unclosed_placeholder() {
        assert_eq!(substitute_env("tail ${UNCLOSED"), "tail ${UNCLOSED");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
