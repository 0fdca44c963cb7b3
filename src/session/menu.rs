//! Selection menus used by the session screens.

use crate::catalog::Project;
use crossterm::event::KeyCode;

#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction<T> {
    None,
    Selected(T),
    Back,
}

/// A vertical list with one highlighted entry.
#[derive(Debug, Clone)]
pub struct Menu<T> {
    items: Vec<(String, T)>,
    selected: usize,
}

impl<T> Default for Menu<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
        }
    }
}

impl<T: Clone> Menu<T> {
    pub fn new(items: Vec<(String, T)>) -> Self {
        Self { items, selected: 0 }
    }

    /// Replace the entries and move the highlight back to the top.
    pub fn set_items(&mut self, items: Vec<(String, T)>) {
        self.items = items;
        self.selected = 0;
    }

    pub fn clear(&mut self) {
        self.set_items(Vec::new());
    }

    pub fn selected(&self) -> Option<&T> {
        self.items.get(self.selected).map(|(_, value)| value)
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(label, _)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn handle_key(&mut self, key: KeyCode) -> MenuAction<T> {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                MenuAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.items.len() {
                    self.selected += 1;
                }
                MenuAction::None
            }
            KeyCode::Home => {
                self.selected = 0;
                MenuAction::None
            }
            KeyCode::End => {
                self.selected = self.items.len().saturating_sub(1);
                MenuAction::None
            }
            KeyCode::Enter => match self.selected() {
                Some(value) => MenuAction::Selected(value.clone()),
                None => MenuAction::None,
            },
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Left => MenuAction::Back,
            _ => MenuAction::None,
        }
    }

    /// Update entries in place, keeping the highlight.
    pub fn update(&mut self, mut f: impl FnMut(&mut String, &mut T)) {
        for (label, value) in &mut self.items {
            f(label, value);
        }
    }
}

// ============================================================================
// Variant menu
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantMode {
    Download,
    Test,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantChoice {
    pub project: Project,
    pub variant: String,
    pub downloaded: bool,
}

impl VariantChoice {
    pub fn label(&self) -> String {
        if self.downloaded {
            format!("{} (downloaded)", self.variant)
        } else {
            self.variant.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariantAction {
    None,
    /// Download or test the chosen variant, depending on the mode.
    Start(VariantChoice),
    /// Open the downloaded project directory.
    Open(VariantChoice),
    Back,
}

/// Variant picker shared by the download and test flows.
#[derive(Debug, Clone)]
pub struct VariantMenu {
    mode: VariantMode,
    menu: Menu<VariantChoice>,
}

impl VariantMenu {
    pub fn new(mode: VariantMode) -> Self {
        Self {
            mode,
            menu: Menu::default(),
        }
    }

    pub fn mode(&self) -> VariantMode {
        self.mode
    }

    pub fn set_choices(&mut self, mode: VariantMode, choices: Vec<VariantChoice>) {
        self.mode = mode;
        self.menu
            .set_items(choices.into_iter().map(|c| (c.label(), c)).collect());
    }

    pub fn selected(&self) -> Option<&VariantChoice> {
        self.menu.selected()
    }

    pub fn menu(&self) -> &Menu<VariantChoice> {
        &self.menu
    }

    pub fn mark_downloaded(&mut self, project_id: u64) {
        self.menu.update(|label, choice| {
            if choice.project.id == project_id {
                choice.downloaded = true;
                *label = choice.label();
            }
        });
    }

    pub fn handle_key(&mut self, key: KeyCode) -> VariantAction {
        if self.mode == VariantMode::Download && key == KeyCode::Char('o') {
            return match self.menu.selected() {
                Some(choice) if choice.downloaded => VariantAction::Open(choice.clone()),
                _ => VariantAction::None,
            };
        }

        match self.menu.handle_key(key) {
            MenuAction::None => VariantAction::None,
            MenuAction::Selected(choice) => VariantAction::Start(choice),
            MenuAction::Back => VariantAction::Back,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> Menu<u32> {
        Menu::new(vec![
            ("one".to_string(), 1),
            ("two".to_string(), 2),
            ("three".to_string(), 3),
        ])
    }

    fn choice(id: u64, variant: &str, downloaded: bool) -> VariantChoice {
        VariantChoice {
            project: Project {
                id,
                name: "Shell".to_string(),
                languages: variant.to_string(),
                difficulty: String::new(),
                estimated_duration: String::new(),
                description: String::new(),
                access_tier: String::new(),
            },
            variant: variant.to_string(),
            downloaded,
        }
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut menu = menu();
        menu.handle_key(KeyCode::Up);
        assert_eq!(menu.selected(), Some(&1));

        for _ in 0..5 {
            menu.handle_key(KeyCode::Down);
        }
        assert_eq!(menu.selected(), Some(&3));

        menu.handle_key(KeyCode::Home);
        assert_eq!(menu.selected_index(), 0);
        menu.handle_key(KeyCode::End);
        assert_eq!(menu.selected_index(), 2);
    }

    #[test]
    fn test_enter_selects_and_esc_goes_back() {
        let mut menu = menu();
        menu.handle_key(KeyCode::Char('j'));
        assert_eq!(menu.handle_key(KeyCode::Enter), MenuAction::Selected(2));
        assert_eq!(menu.handle_key(KeyCode::Esc), MenuAction::Back);
        assert_eq!(menu.handle_key(KeyCode::Char('x')), MenuAction::None);
    }

    #[test]
    fn test_empty_menu_selects_nothing() {
        let mut menu: Menu<u32> = Menu::default();
        assert!(menu.is_empty());
        assert_eq!(menu.handle_key(KeyCode::Enter), MenuAction::None);
        assert_eq!(menu.handle_key(KeyCode::End), MenuAction::None);
        assert_eq!(menu.selected(), None);
    }

    #[test]
    fn test_set_items_resets_selection() {
        let mut menu = menu();
        menu.handle_key(KeyCode::End);
        menu.set_items(vec![("a".to_string(), 10), ("b".to_string(), 20)]);
        assert_eq!(menu.selected(), Some(&10));
        assert_eq!(menu.labels().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_variant_menu_open_only_for_downloaded_in_download_mode() {
        let mut variants = VariantMenu::new(VariantMode::Download);
        variants.set_choices(
            VariantMode::Download,
            vec![choice(1, "rust", false), choice(2, "go", true)],
        );

        assert_eq!(variants.handle_key(KeyCode::Char('o')), VariantAction::None);
        variants.handle_key(KeyCode::Down);
        assert_eq!(
            variants.handle_key(KeyCode::Char('o')),
            VariantAction::Open(choice(2, "go", true))
        );

        variants.set_choices(VariantMode::Test, vec![choice(2, "go", true)]);
        assert_eq!(variants.handle_key(KeyCode::Char('o')), VariantAction::None);
        assert_eq!(
            variants.handle_key(KeyCode::Enter),
            VariantAction::Start(choice(2, "go", true))
        );
        assert_eq!(variants.handle_key(KeyCode::Esc), VariantAction::Back);
    }

    #[test]
    fn test_mark_downloaded_updates_label() {
        let mut variants = VariantMenu::new(VariantMode::Download);
        variants.set_choices(
            VariantMode::Download,
            vec![choice(1, "rust", false), choice(2, "go", false)],
        );

        variants.mark_downloaded(1);

        let labels: Vec<&str> = variants.menu().labels().collect();
        assert_eq!(labels, vec!["rust (downloaded)", "go"]);
        assert!(variants.selected().unwrap().downloaded);
    }
}
