use thiserror::Error;

use super::types::BrowserRule;

/// Error raised when rule data violates catalog invariants
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("browser key must not be empty")]
    EmptyKey,

    #[error("browser '{key}' has no display name")]
    EmptyName { key: String },

    #[error("browser '{key}' has no process names")]
    NoProcessNames { key: String },

    #[error("browser '{key}' has an empty process name")]
    EmptyProcessName { key: String },

    #[error("browser '{key}' declares both incognito and private markers")]
    ConflictingMarkers { key: String },
}

/// One keyed entry of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub key: String,
    pub rule: BrowserRule,
}

/// Ordered, immutable table of known browsers
///
/// Built once at startup and passed by reference to whatever needs it.
/// Iteration order is insertion order, which is also the sweep order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCatalog {
    entries: Vec<CatalogEntry>,
}

impl BrowserCatalog {
    /// Build a catalog from explicit entries, validating each rule
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut catalog = Self {
            entries: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            catalog = catalog.with_rule(entry.key, entry.rule)?;
        }
        Ok(catalog)
    }

    /// The major desktop browsers
    pub fn builtin() -> Self {
        Self {
            entries: builtin_entries(),
        }
    }

    /// Add a rule, replacing an existing entry with the same key in place
    ///
    /// Process names are lower-cased before the rule is stored.
    pub fn with_rule(
        mut self,
        key: impl Into<String>,
        mut rule: BrowserRule,
    ) -> Result<Self, CatalogError> {
        let key = key.into();
        validate_rule(&key, &mut rule)?;

        if let Some(existing) = self.entries.iter_mut().find(|e| e.key == key) {
            existing.rule = rule;
        } else {
            self.entries.push(CatalogEntry { key, rule });
        }
        Ok(self)
    }

    /// Look up a rule by key
    pub fn get(&self, key: &str) -> Option<&BrowserRule> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.rule)
    }

    /// Iterate over (key, rule) pairs in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BrowserRule)> {
        self.entries.iter().map(|e| (e.key.as_str(), &e.rule))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BrowserCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate_rule(key: &str, rule: &mut BrowserRule) -> Result<(), CatalogError> {
    if key.trim().is_empty() {
        return Err(CatalogError::EmptyKey);
    }
    if rule.name.trim().is_empty() {
        return Err(CatalogError::EmptyName {
            key: key.to_string(),
        });
    }
    if rule.process_names.is_empty() {
        return Err(CatalogError::NoProcessNames {
            key: key.to_string(),
        });
    }
    if rule.process_names.iter().any(|p| p.trim().is_empty()) {
        return Err(CatalogError::EmptyProcessName {
            key: key.to_string(),
        });
    }
    if !rule.incognito_markers.is_empty() && !rule.private_markers.is_empty() {
        return Err(CatalogError::ConflictingMarkers {
            key: key.to_string(),
        });
    }

    for name in rule.process_names.iter_mut() {
        *name = name.trim().to_lowercase();
    }
    Ok(())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn builtin_entries() -> Vec<CatalogEntry> {
    let entry = |key: &str,
                 name: &str,
                 process: &str,
                 suffix: &str,
                 incognito: &[&str],
                 private: &[&str],
                 icon: &str,
                 chromium: bool| CatalogEntry {
        key: key.to_string(),
        rule: BrowserRule {
            name: name.to_string(),
            process_names: vec![process.to_string()],
            normal_suffixes: vec![suffix.to_string()],
            incognito_markers: strings(incognito),
            private_markers: strings(private),
            icon_key: icon.to_string(),
            chromium,
        },
    };

    vec![
        entry(
            "chrome",
            "Google Chrome",
            "chrome",
            " - Google Chrome",
            &["Incognito", "Guest"],
            &[],
            "chrome",
            true,
        ),
        entry(
            "msedge",
            "Microsoft Edge",
            "msedge",
            " - Microsoft Edge",
            &["InPrivate", "InPrivate Browsing"],
            &[],
            "edge",
            true,
        ),
        entry(
            "firefox",
            "Mozilla Firefox",
            "firefox",
            " - Mozilla Firefox",
            &[],
            &["Private Browsing"],
            "firefox",
            false,
        ),
        entry(
            "opera",
            "Opera",
            "opera",
            " - Opera",
            &[],
            &["Private Mode"],
            "opera",
            true,
        ),
        entry(
            "brave",
            "Brave",
            "brave",
            " - Brave",
            &[],
            &["Private Window"],
            "brave",
            true,
        ),
        entry(
            "vivaldi",
            "Vivaldi",
            "vivaldi",
            " - Vivaldi",
            &[],
            &["Private Window"],
            "vivaldi",
            true,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_rule(process: &str) -> BrowserRule {
        BrowserRule {
            name: "LibreWolf".to_string(),
            process_names: vec![process.to_string()],
            normal_suffixes: vec![" — LibreWolf".to_string()],
            incognito_markers: Vec::new(),
            private_markers: vec!["Private Browsing".to_string()],
            icon_key: "librewolf".to_string(),
            chromium: false,
        }
    }

    #[test]
    fn test_builtin_contains_major_browsers_in_order() {
        let catalog = BrowserCatalog::builtin();
        let keys: Vec<&str> = catalog.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["chrome", "msedge", "firefox", "opera", "brave", "vivaldi"]
        );
    }

    #[test]
    fn test_builtin_rules_satisfy_invariants() {
        for (key, rule) in BrowserCatalog::builtin().iter() {
            assert!(!rule.process_names.is_empty(), "{key}");
            for name in &rule.process_names {
                assert!(!name.is_empty(), "{key}");
                assert_eq!(name, &name.to_lowercase(), "{key}");
            }
            assert!(
                rule.incognito_markers.is_empty() || rule.private_markers.is_empty(),
                "{key} declares both marker kinds"
            );
        }
    }

    #[test]
    fn test_builtin_suffixes() {
        let catalog = BrowserCatalog::builtin();
        assert_eq!(
            catalog.get("chrome").unwrap().normal_suffixes,
            vec![" - Google Chrome"]
        );
        assert_eq!(
            catalog.get("firefox").unwrap().normal_suffixes,
            vec![" - Mozilla Firefox"]
        );
        assert!(catalog.get("netscape").is_none());
    }

    #[test]
    fn test_with_rule_appends_and_lowercases() {
        let catalog = BrowserCatalog::builtin()
            .with_rule("librewolf", custom_rule("LibreWolf"))
            .unwrap();
        assert_eq!(catalog.len(), 7);
        assert_eq!(
            catalog.get("librewolf").unwrap().process_names,
            vec!["librewolf"]
        );
    }

    #[test]
    fn test_with_rule_replaces_existing_key_in_place() {
        let catalog = BrowserCatalog::builtin()
            .with_rule("firefox", custom_rule("librewolf"))
            .unwrap();
        assert_eq!(catalog.len(), 6);
        let (key, rule) = catalog.iter().nth(2).unwrap();
        assert_eq!(key, "firefox");
        assert_eq!(rule.name, "LibreWolf");
    }

    #[test]
    fn test_rejects_invalid_rules() {
        let mut both = custom_rule("x");
        both.incognito_markers = vec!["Incognito".to_string()];
        assert_eq!(
            BrowserCatalog::builtin().with_rule("x", both),
            Err(CatalogError::ConflictingMarkers {
                key: "x".to_string()
            })
        );

        assert_eq!(
            BrowserCatalog::builtin().with_rule("x", custom_rule("  ")),
            Err(CatalogError::EmptyProcessName {
                key: "x".to_string()
            })
        );

        assert_eq!(
            BrowserCatalog::builtin().with_rule("", custom_rule("x")),
            Err(CatalogError::EmptyKey)
        );
    }
}
