//! Color palette and preset styles.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::Badge;

/// Clinical theme: teal primary, slate neutrals, semantic badge colors.
pub struct ClinicalTheme;

impl ClinicalTheme {
    pub const PRIMARY: Color = Color::Rgb(13, 148, 136); // #0D9488
    pub const PRIMARY_LIGHT: Color = Color::Rgb(45, 212, 191); // #2DD4BF

    pub const BORDER: Color = Color::Rgb(148, 163, 184); // #94A3B8

    pub const INFO: Color = Color::Rgb(59, 130, 246); // #3B82F6

    pub const TEXT_PRIMARY: Color = Color::Rgb(248, 250, 252); // #F8FAFC
    pub const TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184); // #94A3B8
    pub const TEXT_MUTED: Color = Color::Rgb(100, 116, 139); // #64748B

    #[must_use]
    pub fn title() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    #[must_use]
    pub fn info() -> Style {
        Style::default().fg(Self::INFO)
    }

    #[must_use]
    pub fn success() -> Style {
        Self::badge(Badge::Positive)
    }

    #[must_use]
    pub fn warning() -> Style {
        Self::badge(Badge::Warning)
    }

    /// Errors that are not a risk badge (load failures, evaluation errors).
    #[must_use]
    pub fn danger() -> Style {
        Self::badge(Badge::Negative)
    }

    #[must_use]
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn cursor() -> Style {
        Style::default().fg(Self::PRIMARY_LIGHT)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(Self::PRIMARY)
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Foreground style for a risk badge.
    #[must_use]
    pub fn badge(badge: Badge) -> Style {
        let (r, g, b) = badge.color();
        Style::default().fg(Color::Rgb(r, g, b))
    }

    /// Filled style for the badge chip itself.
    #[must_use]
    pub fn badge_chip(badge: Badge) -> Style {
        let (r, g, b) = badge.color();
        Style::default()
            .fg(Color::Rgb(15, 23, 42))
            .bg(Color::Rgb(r, g, b))
            .add_modifier(Modifier::BOLD)
    }
}
