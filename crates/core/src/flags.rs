//! Declarative flag grammar for directive lines.
//!
//! A [`FlagTable`] maps every accepted spelling to a destination and an
//! arity. The resolver never hardwires flag names; it consults the table it
//! was configured with.

use crate::ast::OptionKey;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Takes no value (`--pre`).
    Switch,
    /// Takes exactly one value (`--index-url URL`).
    Value,
}

/// Options scoped to the requirement on the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementOption {
    Hash,
    GlobalOption,
    InstallOption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dest {
    Option(OptionKey),
    /// `-e`: the value is an editable URL or path.
    Editable,
    Requirement(RequirementOption),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub names: Vec<String>,
    pub dest: Dest,
    pub arity: Arity,
}

impl FlagSpec {
    pub fn new(names: &[&str], dest: Dest) -> Self {
        let arity = match dest {
            Dest::Option(key) if key.is_switch() => Arity::Switch,
            _ => Arity::Value,
        };
        FlagSpec {
            names: names.iter().map(|n| (*n).to_owned()).collect(),
            dest,
            arity,
        }
    }

    /// The longest spelling, used in messages (`--index-url` rather than `-i`).
    pub fn display_name(&self) -> &str {
        self.names
            .iter()
            .max_by_key(|n| n.len())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

const STANDARD: &[(&[&str], Dest)] = &[
    (&["-i", "--index-url", "--pypi-url"], Dest::Option(OptionKey::IndexUrl)),
    (&["--extra-index-url"], Dest::Option(OptionKey::ExtraIndexUrls)),
    (&["--no-index"], Dest::Option(OptionKey::NoIndex)),
    (&["-c", "--constraint"], Dest::Option(OptionKey::Constraints)),
    (
        &["-r", "--requirement", "--requirements"],
        Dest::Option(OptionKey::Requirements),
    ),
    (&["-e", "--editable"], Dest::Editable),
    (&["-f", "--find-links"], Dest::Option(OptionKey::FindLinks)),
    (&["--no-binary"], Dest::Option(OptionKey::NoBinary)),
    (&["--only-binary"], Dest::Option(OptionKey::OnlyBinary)),
    (&["--prefer-binary"], Dest::Option(OptionKey::PreferBinary)),
    (&["--require-hashes"], Dest::Option(OptionKey::RequireHashes)),
    (&["--pre"], Dest::Option(OptionKey::Pre)),
    (&["--trusted-host"], Dest::Option(OptionKey::TrustedHosts)),
    (&["--use-feature"], Dest::Option(OptionKey::UseFeatures)),
    (&["--hash"], Dest::Requirement(RequirementOption::Hash)),
    (
        &["--global-option"],
        Dest::Requirement(RequirementOption::GlobalOption),
    ),
    (
        &["--install-option"],
        Dest::Requirement(RequirementOption::InstallOption),
    ),
];

#[derive(Debug, Clone)]
pub struct FlagTable {
    specs: Vec<FlagSpec>,
    by_name: HashMap<String, usize>,
}

impl Default for FlagTable {
    fn default() -> Self {
        FlagTable::standard()
    }
}

impl FlagTable {
    /// Build a table, rejecting spellings that are claimed twice or that do
    /// not look like flags.
    pub fn new(specs: Vec<FlagSpec>) -> Result<Self, String> {
        let mut by_name = HashMap::new();
        for (idx, spec) in specs.iter().enumerate() {
            for name in &spec.names {
                check_spelling(name)?;
                if by_name.insert(name.clone(), idx).is_some() {
                    return Err(format!("flag '{}' is defined more than once", name));
                }
            }
        }
        Ok(FlagTable { specs, by_name })
    }

    /// The flags a requirements file accepts.
    pub fn standard() -> Self {
        let mut table = FlagTable {
            specs: Vec::with_capacity(STANDARD.len()),
            by_name: HashMap::new(),
        };
        for (names, dest) in STANDARD {
            let idx = table.specs.len();
            for name in names.iter() {
                table.by_name.insert((*name).to_owned(), idx);
            }
            table.specs.push(FlagSpec::new(names, *dest));
        }
        table
    }

    /// Add `alias` as another spelling of the flag `existing` is a spelling of.
    pub fn with_alias(mut self, alias: &str, existing: &str) -> Result<Self, String> {
        check_spelling(alias)?;
        let idx = *self
            .by_name
            .get(existing)
            .ok_or_else(|| format!("cannot alias unknown flag '{}'", existing))?;
        if self.by_name.contains_key(alias) {
            return Err(format!("flag '{}' is defined more than once", alias));
        }
        self.specs[idx].names.push(alias.to_owned());
        self.by_name.insert(alias.to_owned(), idx);
        Ok(self)
    }

    pub fn lookup(&self, name: &str) -> Option<&FlagSpec> {
        self.by_name.get(name).map(|idx| &self.specs[*idx])
    }

    /// Short flags are a single dash and a single character (`-i`).
    pub fn lookup_short(&self, c: char) -> Option<&FlagSpec> {
        let mut buf = [0u8; 4];
        let name = format!("-{}", c.encode_utf8(&mut buf));
        self.lookup(&name)
    }

    pub fn specs(&self) -> &[FlagSpec] {
        &self.specs
    }
}

fn check_spelling(name: &str) -> Result<(), String> {
    let valid = match name.strip_prefix("--") {
        Some(long) => long.len() > 1 && !long.starts_with('-') && !long.contains('='),
        None => {
            let mut chars = name.chars();
            chars.next() == Some('-')
                && chars.next().is_some_and(|c| c != '-')
                && chars.next().is_none()
        }
    };
    if valid {
        Ok(())
    } else {
        Err(format!(
            "'{}' is not a valid flag spelling (expected -x or --name)",
            name
        ))
    }
}
