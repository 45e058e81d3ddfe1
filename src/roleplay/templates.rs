use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::SelfPlayError;

const BUILTIN_YAML: &str = include_str!("templates.yaml");

/// A scripted scenario for two bots: who they are and how the
/// conversation opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTemplate {
    pub name: String,
    pub description: String,
    /// First role speaks first.
    pub roles: [String; 2],
    pub start: String,
    /// System instruction keyed by role name.
    pub system_messages: BTreeMap<String, String>,
}

impl RoleTemplate {
    /// The built-in catalogue.
    pub fn all() -> &'static [RoleTemplate] {
        builtin().templates()
    }

    /// Looks a built-in template up by name, ignoring case.
    pub fn find(name: &str) -> Result<&'static RoleTemplate, SelfPlayError> {
        builtin().find(name)
    }

    /// System instruction for `role`.
    pub fn system_message(&self, role: &str) -> Result<&str, SelfPlayError> {
        self.system_messages
            .get(role)
            .map(String::as_str)
            .ok_or_else(|| SelfPlayError::IncompleteTemplate {
                template: self.name.clone(),
                role: role.to_string(),
            })
    }

    fn validate(&self) -> Result<(), SelfPlayError> {
        for role in &self.roles {
            self.system_message(role)?;
        }
        Ok(())
    }
}

/// An ordered set of templates, built-in or loaded from YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateCatalog {
    templates: Vec<RoleTemplate>,
}

fn builtin() -> &'static TemplateCatalog {
    static BUILTIN: OnceLock<TemplateCatalog> = OnceLock::new();
    BUILTIN.get_or_init(|| {
        TemplateCatalog::from_yaml_str(BUILTIN_YAML).expect("built-in templates are valid")
    })
}

impl TemplateCatalog {
    pub fn builtin() -> Self {
        builtin().clone()
    }

    /// Parses a YAML sequence of templates. Every role must have a system
    /// message.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SelfPlayError> {
        let templates: Vec<RoleTemplate> = serde_yaml::from_str(yaml)?;
        for template in &templates {
            template.validate()?;
        }
        Ok(Self { templates })
    }

    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self, SelfPlayError> {
        let path = path.as_ref();
        let catalog = Self::from_yaml_str(&fs::read_to_string(path)?)?;
        log::info!(
            "Loaded {} templates from {}",
            catalog.templates.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Adds `other`'s templates, replacing any with the same name.
    pub fn merge(&mut self, other: TemplateCatalog) {
        for template in other.templates {
            match self
                .templates
                .iter_mut()
                .find(|t| t.name.eq_ignore_ascii_case(&template.name))
            {
                Some(existing) => *existing = template,
                None => self.templates.push(template),
            }
        }
    }

    pub fn find(&self, name: &str) -> Result<&RoleTemplate, SelfPlayError> {
        self.templates
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| SelfPlayError::UnknownTemplate(name.to_string()))
    }

    pub fn templates(&self) -> &[RoleTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
