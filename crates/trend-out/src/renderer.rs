//! Template rendering for the trend report.
//!
//! Uses Handlebars with custom helpers:
//! - bullets: Markdown list of an array, `- (none)` when empty
//! - default: Fallback for null/missing values
//!
//! Output is markdown, so HTML escaping is disabled.

use handlebars::{Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext};
use serde_json::Value;

use crate::templates::TemplatesFile;

/// Placeholder rendered for every empty list
pub const NONE_PLACEHOLDER: &str = "(none)";

/// Compiled renderer with registered helpers
pub struct TemplateRenderer<'a> {
    handlebars: Handlebars<'a>,
    templates: TemplatesFile,
}

impl<'a> TemplateRenderer<'a> {
    /// Create a new renderer from a templates file
    pub fn new(templates: TemplatesFile) -> Result<Self, String> {
        let mut handlebars = Handlebars::new();

        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars.register_helper("bullets", Box::new(BulletsHelper));
        handlebars.register_helper("default", Box::new(DefaultHelper));

        for (name, template) in &templates.templates {
            handlebars
                .register_template_string(name, &template.template)
                .map_err(|e| format!("Template '{}' is invalid: {}", name, e))?;
        }

        Ok(TemplateRenderer { handlebars, templates })
    }

    /// Load from a file path
    pub fn load(path: &str) -> Result<Self, String> {
        Self::new(TemplatesFile::load(path)?)
    }

    /// Renderer over the templates compiled into the crate
    pub fn bundled() -> Result<Self, String> {
        Self::new(TemplatesFile::bundled()?)
    }

    /// Render a named template with data
    pub fn render(&self, template_name: &str, data: &Value) -> Result<String, String> {
        self.handlebars
            .render(template_name, data)
            .map_err(|e| format!("Render error: {}", e))
    }

    /// List available template names
    pub fn list_templates(&self) -> Vec<&str> {
        self.templates.list_templates()
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Custom Helpers
// ============================================================================

/// One `- item` line per array element, or `- (none)`
struct BulletsHelper;

impl HelperDef for BulletsHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let items = h.param(0).and_then(|v| v.value().as_array());

        match items {
            Some(items) if !items.is_empty() => {
                for item in items {
                    out.write(&format!("- {}\n", plain(item)))?;
                }
            }
            _ => out.write(&format!("- {}\n", NONE_PLACEHOLDER))?,
        }
        Ok(())
    }
}

/// Default value helper
struct DefaultHelper;

impl HelperDef for DefaultHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = h.param(0).map(|v| v.value());
        let default = h.param(1)
            .and_then(|v| v.value().as_str())
            .unwrap_or("");

        match value {
            Some(v) if !v.is_null() && v.as_str() != Some("") => out.write(&plain(v))?,
            _ => out.write(default)?,
        }

        Ok(())
    }
}
