pub fn flatten_errors<T>(mut result: anyhow::Result<T>, chained_error: &anyhow::Error) -> anyhow::Result<T> {
    for error in chained_error.chain() {
        result = anyhow::Context::context(result, anyhow::anyhow!("{}", error));
    }
    result
}

/// Renders the non-root causes of an error chain as a bullet list, for
/// presenting alongside a primary message in an `errorAndExit`-style report.
pub trait ReasonsExt {
    fn reasons(&self) -> String;
}

impl ReasonsExt for anyhow::Error {
    fn reasons(&self) -> String {
        let mut reasons = String::new();
        for reason in self.chain().skip(1) {
            if !reasons.is_empty() {
                reasons += "\n";
            }
            reasons += &format!("- {}", reason);
        }
        reasons
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Context;

    #[test]
    fn reasons_skips_the_top_level_message() {
        let err = anyhow::anyhow!("root cause")
            .context("middle")
            .context("top");
        assert_eq!(err.reasons(), "- middle\n- root cause");
    }
}
