//! Processing module descriptions: which files a pipeline variant needs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::CoreError;
use crate::ids::Category;

/// A fixed logical slot among the files a module requires.
///
/// `field` is the multipart field name clients use; `file_name` is the
/// canonical on-disk name, including the extension the processor expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRole {
    pub field: String,
    pub file_name: String,
    pub label: String,
}

impl UploadRole {
    /// Create a role, checking that the file name is a bare name with an
    /// extension.
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let field = field.into();
        let file_name = file_name.into();

        if field.is_empty() {
            return Err(CoreError::InvalidRole {
                field,
                reason: "field name is empty".to_string(),
            });
        }
        if file_name.contains(['/', '\\', '\0']) || file_name.starts_with('.') {
            return Err(CoreError::InvalidRole {
                field,
                reason: format!("'{}' is not a bare file name", file_name),
            });
        }
        if !matches!(file_name.rsplit_once('.'), Some((stem, ext)) if !stem.is_empty() && !ext.is_empty())
        {
            return Err(CoreError::InvalidRole {
                field,
                reason: format!("'{}' has no extension", file_name),
            });
        }

        Ok(Self {
            field,
            file_name,
            label: label.into(),
        })
    }

    /// Extension of the canonical file, without the dot.
    pub fn extension(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or_default()
    }
}

/// Specification of a processing module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Category label; also the URL segment of the module.
    pub name: Category,

    /// Human-readable title.
    pub title: String,

    /// Required uploads in the order they are saved.
    pub roles: Vec<UploadRole>,
}

impl ModuleSpec {
    /// Create a module with no roles.
    pub fn new(name: Category, title: impl Into<String>) -> Self {
        Self {
            name,
            title: title.into(),
            roles: Vec::new(),
        }
    }

    /// Builder method to append a role.
    pub fn with_role(mut self, role: UploadRole) -> Result<Self, CoreError> {
        let clash = self
            .roles
            .iter()
            .any(|r| r.field == role.field || r.file_name == role.file_name);
        if clash {
            return Err(CoreError::DuplicateRole {
                module: self.name.to_string(),
                field: role.field,
            });
        }
        self.roles.push(role);
        Ok(self)
    }

    /// Look up a role by its multipart field name.
    pub fn role(&self, field: &str) -> Option<&UploadRole> {
        self.roles.iter().find(|r| r.field == field)
    }

    /// Field names of all required roles, in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|r| r.field.as_str())
    }

    /// Fields from the module's roles that are not in `present`.
    pub fn missing_fields<'a>(&'a self, present: &HashSet<&str>) -> Vec<&'a str> {
        self.fields().filter(|f| !present.contains(f)).collect()
    }

    /// The payroll reconciliation module: six spreadsheets in, one workbook out.
    pub fn modulo1() -> Result<Self, CoreError> {
        Self::new(Category::new("modulo1")?, "Module 1")
            .with_role(UploadRole::new("OPS", "OPS.xlsx", "Operations sheet")?)?
            .with_role(UploadRole::new(
                "demitidos",
                "demitidos.xls",
                "Terminated employees",
            )?)?
            .with_role(UploadRole::new(
                "AVISO_PREVIO",
                "AVISO_PREVIO.xls",
                "Advance notice",
            )?)?
            .with_role(UploadRole::new(
                "hk_avulso",
                "hk_avulso.xls",
                "Occasional household workers",
            )?)?
            .with_role(UploadRole::new("fp", "fp.xlsx", "Payroll")?)?
            .with_role(UploadRole::new("situacao", "situacao.xlsx", "Employee status")?)
    }

    /// Second module; it has a page but no pipeline yet.
    pub fn modulo2() -> Result<Self, CoreError> {
        Ok(Self::new(Category::new("modulo2")?, "Module 2"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulo1_roles_in_order() {
        let spec = ModuleSpec::modulo1().unwrap();
        let fields: Vec<&str> = spec.fields().collect();
        assert_eq!(
            fields,
            vec!["OPS", "demitidos", "AVISO_PREVIO", "hk_avulso", "fp", "situacao"]
        );
        assert_eq!(spec.role("demitidos").unwrap().extension(), "xls");
        assert_eq!(spec.role("fp").unwrap().file_name, "fp.xlsx");
    }

    #[test]
    fn test_role_rejects_paths_and_missing_extension() {
        assert!(UploadRole::new("a", "../a.xlsx", "").is_err());
        assert!(UploadRole::new("a", "dir/a.xlsx", "").is_err());
        assert!(UploadRole::new("a", "noext", "").is_err());
        assert!(UploadRole::new("", "a.xlsx", "").is_err());
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let spec = ModuleSpec::new(Category::new("m").unwrap(), "M")
            .with_role(UploadRole::new("a", "a.xlsx", "").unwrap())
            .unwrap();
        let err = spec
            .with_role(UploadRole::new("b", "a.xlsx", "").unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateRole { .. }));
    }

    #[test]
    fn test_missing_fields() {
        let spec = ModuleSpec::modulo1().unwrap();
        let present: HashSet<&str> = ["OPS", "fp"].into_iter().collect();
        assert_eq!(
            spec.missing_fields(&present),
            vec!["demitidos", "AVISO_PREVIO", "hk_avulso", "situacao"]
        );
    }
}
