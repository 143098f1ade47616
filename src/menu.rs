//! Category menu and selection model.
//!
//! The menu is static configuration and the only authority on which
//! selections are valid. Two shapes are supported:
//!
//! - **Flat**: an ordered list of categories, selected by `Selection::Category`
//! - **Nested**: main categories with ordered sub-categories, selected by
//!   `Selection::Pair`
//!
//! A selection of the wrong shape for the menu is simply not a leaf and is
//! rejected the same way an unknown category is.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MenuError {
    /// Selection does not name a leaf of the menu.
    #[error("Unknown category: {0}")]
    InvalidSelection(String),

    /// Main-axis switch to a group that does not exist (or a flat menu).
    #[error("Unknown main category: {0}")]
    UnknownMainCategory(String),

    #[error("Menu has no categories")]
    Empty,

    #[error("Menu group '{0}' has no sub-categories")]
    EmptyGroup(String),

    #[error("Duplicate menu entry: {0}")]
    Duplicate(String),
}

// ============================================================================
// Selection
// ============================================================================

/// The user's current viewing coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    /// Single-axis selection in a flat menu.
    Category(String),
    /// Two-axis selection in a nested menu.
    Pair { main: String, sub: String },
}

impl Selection {
    pub fn category(name: impl Into<String>) -> Self {
        Selection::Category(name.into())
    }

    pub fn pair(main: impl Into<String>, sub: impl Into<String>) -> Self {
        Selection::Pair {
            main: main.into(),
            sub: sub.into(),
        }
    }

    /// Main-axis name, if this is a two-axis selection.
    pub fn main(&self) -> Option<&str> {
        match self {
            Selection::Category(_) => None,
            Selection::Pair { main, .. } => Some(main),
        }
    }

    /// The leaf name: the category itself, or the sub-category of a pair.
    pub fn leaf(&self) -> &str {
        match self {
            Selection::Category(name) => name,
            Selection::Pair { sub, .. } => sub,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Category(name) => write!(f, "{}", name),
            Selection::Pair { main, sub } => write!(f, "{} / {}", main, sub),
        }
    }
}

// ============================================================================
// Menu
// ============================================================================

/// A main category and its ordered sub-categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuGroup {
    pub name: String,
    pub subs: Vec<String>,
}

impl MenuGroup {
    pub fn new(name: impl Into<String>, subs: &[&str]) -> Self {
        Self {
            name: name.into(),
            subs: subs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Static category structure. Construct through [`Menu::flat`] or
/// [`Menu::nested`] so the structural checks run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Menu {
    Flat(Vec<String>),
    Nested(Vec<MenuGroup>),
}

impl Default for Menu {
    /// The stock three-group menu the daily brief is published under.
    fn default() -> Self {
        Menu::Nested(vec![
            MenuGroup::new("国内", &["政治", "经济", "科技", "AI"]),
            MenuGroup::new("国际", &["政治", "经济", "科技", "AI"]),
            MenuGroup::new("创意", &["科技产品", "每日一笑"]),
        ])
    }
}

impl Menu {
    /// Build a flat menu. Rejects empty lists and duplicate names.
    pub fn flat<I, S>(categories: I) -> Result<Self, MenuError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories: Vec<String> = categories.into_iter().map(Into::into).collect();
        if categories.is_empty() {
            return Err(MenuError::Empty);
        }
        ensure_unique(categories.iter())?;
        Ok(Menu::Flat(categories))
    }

    /// Build a two-axis menu. Every group needs at least one sub-category,
    /// since switching to a group lands on its first leaf.
    pub fn nested(groups: Vec<MenuGroup>) -> Result<Self, MenuError> {
        if groups.is_empty() {
            return Err(MenuError::Empty);
        }
        ensure_unique(groups.iter().map(|g| &g.name))?;
        for group in &groups {
            if group.subs.is_empty() {
                return Err(MenuError::EmptyGroup(group.name.clone()));
            }
            ensure_unique(group.subs.iter())?;
        }
        Ok(Menu::Nested(groups))
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, Menu::Nested(_))
    }

    /// Check that `selection` names exactly one leaf of this menu.
    pub fn validate(&self, selection: &Selection) -> Result<(), MenuError> {
        let found = match (self, selection) {
            (Menu::Flat(categories), Selection::Category(name)) => categories.contains(name),
            (Menu::Nested(groups), Selection::Pair { main, sub }) => groups
                .iter()
                .any(|g| &g.name == main && g.subs.contains(sub)),
            _ => false,
        };
        if found {
            Ok(())
        } else {
            Err(MenuError::InvalidSelection(selection.to_string()))
        }
    }

    pub fn contains(&self, selection: &Selection) -> bool {
        self.validate(selection).is_ok()
    }

    /// The first leaf in menu order, used as the fallback initial selection.
    pub fn first_leaf(&self) -> Selection {
        // Constructors guarantee at least one leaf; the empty fallbacks only
        // matter for hand-built enum values.
        match self {
            Menu::Flat(categories) => {
                Selection::Category(categories.first().cloned().unwrap_or_default())
            }
            Menu::Nested(groups) => match groups.first() {
                Some(group) => Selection::Pair {
                    main: group.name.clone(),
                    sub: group.subs.first().cloned().unwrap_or_default(),
                },
                None => Selection::Category(String::new()),
            },
        }
    }

    /// Selection produced by switching the main axis: the sub axis resets to
    /// the group's first leaf.
    pub fn select_main(&self, main: &str) -> Result<Selection, MenuError> {
        let Menu::Nested(groups) = self else {
            return Err(MenuError::UnknownMainCategory(main.to_string()));
        };
        groups
            .iter()
            .find(|g| g.name == main)
            .and_then(|g| g.subs.first().map(|sub| Selection::pair(&g.name, sub)))
            .ok_or_else(|| MenuError::UnknownMainCategory(main.to_string()))
    }

    /// Every valid selection, in menu order.
    pub fn leaves(&self) -> Vec<Selection> {
        match self {
            Menu::Flat(categories) => categories.iter().map(Selection::category).collect(),
            Menu::Nested(groups) => groups
                .iter()
                .flat_map(|g| g.subs.iter().map(move |sub| Selection::pair(&g.name, sub)))
                .collect(),
        }
    }
}

fn ensure_unique<'a>(names: impl Iterator<Item = &'a String>) -> Result<(), MenuError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(MenuError::Duplicate(name.clone()));
        }
    }
    Ok(())
}
