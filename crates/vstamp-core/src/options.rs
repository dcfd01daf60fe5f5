//! Effective option resolution and template expansion.
//!
//! Option values merge in a fixed precedence order, lowest to highest:
//! built-in defaults, config file values, explicit call arguments. Textual
//! values may embed `{% name %}` placeholders (a delimiter pair reserved for
//! this task) that expand against the current phase/part/build context, so a
//! build string or a destination path can reference the resolved part.
//!
//! The resolver itself never fails; absent values stay `None` and the phase
//! procedures decide whether that is fatal.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Opening template delimiter.
const OPEN: &str = "{%";
/// Closing template delimiter.
const CLOSE: &str = "%}";

/// Default JSON indentation unit.
pub const DEFAULT_SPACE: &str = "\t";

/// Options as they appear in a config file: everything optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct OptionsConfig {
    /// Indentation unit for rewritten JSON (default: one tab).
    pub space: Option<String>,
    /// Default part when the invocation supplies none.
    pub part: Option<String>,
    /// Default build metadata when the invocation supplies none.
    pub build: Option<String>,
}

/// Fully resolved options for one task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Indentation unit for rewritten JSON.
    pub space: String,
    /// Resolved part, if any.
    pub part: Option<String>,
    /// Resolved build metadata, if any.
    pub build: Option<String>,
}

/// The values `{% name %}` placeholders resolve against.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateContext<'a> {
    /// Current phase name.
    pub phase: &'a str,
    /// Resolved part, once known.
    pub part: Option<&'a str>,
    /// Resolved build metadata, once known.
    pub build: Option<&'a str>,
}

/// Expand `{% name %}` placeholders in `input` against `ctx`.
///
/// Recognized names are `phase`, `part`, and `build`; unknown names expand to
/// the empty string, as does a name whose value is unset. An unterminated
/// opening delimiter is left in place verbatim.
pub fn expand(input: &str, ctx: &TemplateContext<'_>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        match after.find(CLOSE) {
            Some(end) => {
                out.push_str(match after[..end].trim() {
                    "phase" => ctx.phase,
                    "part" => ctx.part.unwrap_or_default(),
                    "build" => ctx.build.unwrap_or_default(),
                    _ => "",
                });
                rest = &after[end + CLOSE.len()..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve effective options for one invocation.
///
/// `part` expands against `{phase}`, then `build` against `{phase, part}`, so
/// a build string can reference the part it accompanies. `space` expands last
/// against the full context.
pub fn resolve(
    phase: &str,
    explicit_part: Option<&str>,
    explicit_build: Option<&str>,
    config: &OptionsConfig,
) -> Options {
    let part = explicit_part
        .map(str::to_owned)
        .or_else(|| config.part.clone());
    let build = explicit_build
        .map(str::to_owned)
        .or_else(|| config.build.clone());
    let space = config
        .space
        .clone()
        .unwrap_or_else(|| DEFAULT_SPACE.to_owned());

    let part = part.map(|value| {
        expand(
            &value,
            &TemplateContext {
                phase,
                ..TemplateContext::default()
            },
        )
    });
    let build = build.map(|value| {
        expand(
            &value,
            &TemplateContext {
                phase,
                part: part.as_deref(),
                build: None,
            },
        )
    });
    let space = expand(
        &space,
        &TemplateContext {
            phase,
            part: part.as_deref(),
            build: build.as_deref(),
        },
    );

    debug!(?part, ?build, space = %space.escape_debug(), "resolved options");
    Options { space, part, build }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let opts = resolve("bump", None, None, &OptionsConfig::default());
        assert_eq!(opts.space, "\t");
        assert_eq!(opts.part, None);
        assert_eq!(opts.build, None);
    }

    #[test]
    fn config_overrides_defaults() {
        let config = OptionsConfig {
            space: Some("  ".to_owned()),
            part: Some("minor".to_owned()),
            build: None,
        };
        let opts = resolve("bump", None, None, &config);
        assert_eq!(opts.space, "  ");
        assert_eq!(opts.part.as_deref(), Some("minor"));
    }

    #[test]
    fn explicit_overrides_config() {
        let config = OptionsConfig {
            space: None,
            part: Some("minor".to_owned()),
            build: Some("config".to_owned()),
        };
        let opts = resolve("bump", Some("patch"), Some("cli"), &config);
        assert_eq!(opts.part.as_deref(), Some("patch"));
        assert_eq!(opts.build.as_deref(), Some("cli"));
    }

    #[test]
    fn expand_known_names() {
        let ctx = TemplateContext {
            phase: "bump",
            part: Some("patch"),
            build: Some("7"),
        };
        assert_eq!(
            expand("{%phase%}/{% part %}+{%build%}", &ctx),
            "bump/patch+7"
        );
    }

    #[test]
    fn expand_unknown_and_unset_names() {
        let ctx = TemplateContext {
            phase: "set",
            part: None,
            build: None,
        };
        assert_eq!(expand("a{%part%}b{%nope%}c", &ctx), "abc");
    }

    #[test]
    fn expand_unterminated_left_verbatim() {
        let ctx = TemplateContext {
            phase: "set",
            part: None,
            build: None,
        };
        assert_eq!(expand("tail {%part", &ctx), "tail {%part");
    }

    #[test]
    fn build_can_reference_part() {
        let config = OptionsConfig {
            space: None,
            part: None,
            build: Some("{%part%}.7".to_owned()),
        };
        let opts = resolve("bump", Some("patch"), None, &config);
        assert_eq!(opts.build.as_deref(), Some("patch.7"));
    }
}
