//! Option accumulation for one logical line.
//!
//! Scalar options overwrite, list options append in encounter order. Nothing
//! here merges across lines.

use crate::ast::{OptionKey, OptionValue, Options};
use crate::flags::{Arity, Dest, FlagSpec, FlagTable, RequirementOption};

/// Everything the options part of one line produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulated {
    pub options: Options,
    pub editables: Vec<String>,
    pub hashes: Vec<String>,
    pub global_options: Vec<String>,
    pub install_options: Vec<String>,
    /// Words that are neither flags nor flag values.
    pub positionals: Vec<String>,
}

impl Accumulated {
    pub fn has_requirement_options(&self) -> bool {
        !self.hashes.is_empty() || !self.global_options.is_empty() || !self.install_options.is_empty()
    }
}

/// A rejected word and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionError {
    pub token: String,
    pub reason: String,
}

impl OptionError {
    fn new(token: &str, reason: impl Into<String>) -> Self {
        OptionError {
            token: token.to_owned(),
            reason: reason.into(),
        }
    }
}

const HASH_HINT: &str =
    "Arguments to --hash must be a hash name followed by a value, like --hash=sha256:abcde...";

fn apply(
    acc: &mut Accumulated,
    spec: &FlagSpec,
    token: &str,
    value: Option<String>,
) -> Result<(), OptionError> {
    match (spec.dest, value) {
        (Dest::Option(key), None) => {
            acc.options.insert(key, OptionValue::Flag(true));
        }
        (Dest::Option(key), Some(value)) => {
            // legacy spelling: `--index-url==url`
            let value = value.trim_start_matches('=').to_owned();
            if key == OptionKey::IndexUrl {
                acc.options.insert(key, OptionValue::Text(value));
            } else {
                let slot = acc
                    .options
                    .entry(key)
                    .or_insert_with(|| OptionValue::List(Vec::new()));
                if let OptionValue::List(items) = slot {
                    items.push(value);
                }
            }
        }
        (Dest::Editable, Some(value)) => acc.editables.push(value),
        (Dest::Requirement(RequirementOption::Hash), Some(value)) => {
            match value.split_once(':') {
                Some((algo, digest)) if !algo.is_empty() && !digest.is_empty() => {
                    acc.hashes.push(value)
                }
                _ => return Err(OptionError::new(token, HASH_HINT)),
            }
        }
        (Dest::Requirement(RequirementOption::GlobalOption), Some(value)) => {
            acc.global_options.push(value)
        }
        (Dest::Requirement(RequirementOption::InstallOption), Some(value)) => {
            acc.install_options.push(value)
        }
        (_, None) => {
            return Err(OptionError::new(
                token,
                format!("{} option requires 1 argument", spec.display_name()),
            ))
        }
    }
    Ok(())
}

/// Interpret shell-split words against the flag table.
pub fn accumulate(words: &[String], flags: &FlagTable) -> Result<Accumulated, OptionError> {
    let mut acc = Accumulated::default();
    let mut rest = words.iter();

    while let Some(word) = rest.next() {
        if word == "--" {
            acc.positionals.extend(rest.by_ref().cloned());
            break;
        }

        if word.starts_with("--") {
            let (name, inline) = match word.split_once('=') {
                Some((name, value)) => (name, Some(value.to_owned())),
                None => (word.as_str(), None),
            };
            let spec = flags
                .lookup(name)
                .ok_or_else(|| OptionError::new(word, format!("no such option: {}", name)))?;
            let value = match spec.arity {
                Arity::Switch => {
                    if inline.is_some() {
                        return Err(OptionError::new(
                            word,
                            format!("{} option does not take a value", name),
                        ));
                    }
                    None
                }
                Arity::Value => match inline {
                    Some(value) => Some(value),
                    None => Some(rest.next().cloned().ok_or_else(|| {
                        OptionError::new(word, format!("{} option requires 1 argument", name))
                    })?),
                },
            };
            apply(&mut acc, spec, word, value)?;
            continue;
        }

        if word.len() > 1 && word.starts_with('-') {
            // short flags may be clustered (`-ab`) and take attached values (`-iurl`)
            let cluster = &word[1..];
            for (idx, c) in cluster.char_indices() {
                let spec = flags
                    .lookup_short(c)
                    .ok_or_else(|| OptionError::new(word, format!("no such option: -{}", c)))?;
                if spec.arity == Arity::Switch {
                    apply(&mut acc, spec, word, None)?;
                    continue;
                }
                let attached = &cluster[idx + c.len_utf8()..];
                let value = if attached.is_empty() {
                    rest.next().cloned().ok_or_else(|| {
                        OptionError::new(word, format!("-{} option requires 1 argument", c))
                    })?
                } else {
                    attached.to_owned()
                };
                apply(&mut acc, spec, word, Some(value))?;
                break;
            }
            continue;
        }

        acc.positionals.push(word.clone());
    }

    Ok(acc)
}
