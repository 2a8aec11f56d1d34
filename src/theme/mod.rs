//! Theme engine
//!
//! Template rendering using Tera. Templates are `.html` files under
//! `themes/<name>/`, loaded recursively at startup; page handlers render
//! them by name from a serializable context.

use serde::Serialize;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

/// Theme engine wrapping a loaded Tera instance
pub struct ThemeEngine {
    tera: Tera,
    theme_name: String,
}

impl ThemeEngine {
    /// Load the templates of a theme.
    ///
    /// # Arguments
    /// * `themes_path` - Path to the themes directory
    /// * `theme_name` - Name of the theme to load
    pub fn new(themes_path: &Path, theme_name: &str) -> Result<Self, ThemeError> {
        let theme_path = themes_path.join(theme_name);
        if !theme_path.is_dir() {
            return Err(ThemeError::NotFound(theme_name.to_string()));
        }

        let mut templates: Vec<(String, String)> = Vec::new();
        collect_templates(&theme_path, &theme_path, &mut templates)?;

        // Base templates must be registered before the templates that
        // extend them
        templates.sort_by(|a, b| {
            let a_is_base = a.0 == "base.html" || a.0.ends_with("/base.html");
            let b_is_base = b.0 == "base.html" || b.0.ends_with("/base.html");
            b_is_base.cmp(&a_is_base)
        });

        let mut tera = Tera::default();
        for (name, content) in templates {
            tera.add_raw_template(&name, &content).map_err(|e| {
                ThemeError::TemplateError(format!("Failed to add template {}: {}", name, e))
            })?;
        }
        tera.build_inheritance_chains().map_err(|e| {
            ThemeError::TemplateError(format!("Failed to build template inheritance: {}", e))
        })?;

        Ok(Self {
            tera,
            theme_name: theme_name.to_string(),
        })
    }

    /// Name of the loaded theme
    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    /// Render a template by name from a serializable context
    pub fn render<C: Serialize>(&self, template: &str, context: &C) -> Result<String, ThemeError> {
        let tera_context = TeraContext::from_serialize(context).map_err(|e| {
            ThemeError::RenderError {
                template: template.to_string(),
                message: format!("context serialization failed: {}", e),
            }
        })?;

        self.tera
            .render(template, &tera_context)
            .map_err(|e| ThemeError::RenderError {
                template: template.to_string(),
                message: e.to_string(),
            })
    }
}

/// Collect `.html` templates recursively, named by their path relative to
/// the theme root
fn collect_templates(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), ThemeError> {
    for entry in fs::read_dir(current_path)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_templates(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let name = template_name(base_path, &path)?;
            let content = fs::read_to_string(&path)?;
            templates.push((name, content));
        }
    }

    Ok(())
}

fn template_name(base_path: &Path, path: &Path) -> Result<String, ThemeError> {
    let relative = path
        .strip_prefix(base_path)
        .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
    Ok(relative.to_string_lossy().replace('\\', "/"))
}
