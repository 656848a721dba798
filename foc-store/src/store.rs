//! Pure in-memory template collection. Selection, view state and
//! persistence live in the session; this type only owns the list and its
//! permission rules.

use foc_model::template::Template;

#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: Vec<Template>,
}

impl TemplateStore {
    pub fn new(templates: Vec<Template>) -> Self {
        TemplateStore { templates }
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.iter().any(|t| t.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Template> {
        self.templates.iter_mut().find(|t| t.id == id)
    }

    /// The template selection falls back to: the first one flagged default,
    /// or the first one in the list if none carry the flag.
    pub fn default_template(&self) -> Option<&Template> {
        self.templates
            .iter()
            .find(|t| t.is_default)
            .or_else(|| self.templates.first())
    }

    pub fn insert(&mut self, template: Template) {
        self.templates.push(template);
    }

    /// Replaces the template with the same id. Returns false when no such
    /// template exists.
    pub fn replace(&mut self, template: Template) -> bool {
        match self.get_mut(&template.id) {
            Some(slot) => {
                *slot = template;
                true
            }
            None => false,
        }
    }

    /// Renames a template. Permitted on any template, defaults included;
    /// only the cost sheet is guarded by the editable flag.
    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        match self.get_mut(id) {
            Some(template) => {
                template.name = name.to_string();
                template.touch();
                true
            }
            None => false,
        }
    }

    /// Removes a template. Default templates are kept, so there is always
    /// something to fall back to; returns the removed template otherwise.
    pub fn remove(&mut self, id: &str) -> Option<Template> {
        let index = self.templates.iter().position(|t| t.id == id)?;
        if self.templates[index].is_default {
            log::debug!("[FOC Debug] store: refusing to delete default template {id}");
            return None;
        }
        Some(self.templates.remove(index))
    }
}
