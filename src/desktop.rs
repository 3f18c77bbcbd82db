/// Desktop environments offered by the package chooser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Desktop {
    Gnome,
    Plasma5,
    Plasma6,
    Xfce,
    Pantheon,
    Cinnamon,
    Mate,
    Enlightenment,
    Lxqt,
    Lumina,
    Budgie,
    Deepin,
}

impl Desktop {
    pub const ALL: [Desktop; 12] = [
        Desktop::Gnome,
        Desktop::Plasma5,
        Desktop::Plasma6,
        Desktop::Xfce,
        Desktop::Pantheon,
        Desktop::Cinnamon,
        Desktop::Mate,
        Desktop::Enlightenment,
        Desktop::Lxqt,
        Desktop::Lumina,
        Desktop::Budgie,
        Desktop::Deepin,
    ];

    /// Package chooser id
    pub fn id(self) -> &'static str {
        match self {
            Desktop::Gnome => "gnome",
            Desktop::Plasma5 => "plasma5",
            Desktop::Plasma6 => "plasma6",
            Desktop::Xfce => "xfce",
            Desktop::Pantheon => "pantheon",
            Desktop::Cinnamon => "cinnamon",
            Desktop::Mate => "mate",
            Desktop::Enlightenment => "enlightenment",
            Desktop::Lxqt => "lxqt",
            Desktop::Lumina => "lumina",
            Desktop::Budgie => "budgie",
            Desktop::Deepin => "deepin",
        }
    }

    pub fn from_choice(choice: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.id() == choice)
    }

    pub fn snippet(self) -> String {
        format!("desktopEnv/{}", self.id())
    }

    /// Uses connman instead of NetworkManager
    pub fn uses_connman(self) -> bool {
        self == Desktop::Enlightenment
    }

    /// Needs the standalone nm-applet for a tray icon
    pub fn needs_nm_applet(self) -> bool {
        matches!(self, Desktop::Mate | Desktop::Lxqt | Desktop::Lumina)
    }

    /// Extra lines for the `pkgs` placeholder
    pub fn extra_packages(self) -> &'static str {
        match self {
            Desktop::Plasma5 => "\n      kate\n    #  thunderbird\n    ",
            Desktop::Plasma6 => "\n      kdePackages.kate\n    #  thunderbird\n    ",
            _ => DEFAULT_EXTRA_PACKAGES,
        }
    }
}

/// `pkgs` for a non-empty choice that is not a known desktop
pub const DEFAULT_EXTRA_PACKAGES: &str = "\n    #  thunderbird\n    ";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for desktop in Desktop::ALL {
            assert_eq!(Desktop::from_choice(desktop.id()), Some(desktop));
        }
    }

    #[test]
    fn unknown_choice_is_none() {
        assert_eq!(Desktop::from_choice("sway"), None);
        assert_eq!(Desktop::from_choice(""), None);
    }

    #[test]
    fn snippet_is_namespaced() {
        assert_eq!(Desktop::Budgie.snippet(), "desktopEnv/budgie");
    }

    #[test]
    fn only_enlightenment_uses_connman() {
        let connman: Vec<_> = Desktop::ALL.into_iter().filter(|d| d.uses_connman()).collect();
        assert_eq!(connman, vec![Desktop::Enlightenment]);
    }

    #[test]
    fn nm_applet_desktops() {
        let applet: Vec<_> = Desktop::ALL
            .into_iter()
            .filter(|d| d.needs_nm_applet())
            .collect();
        assert_eq!(applet, vec![Desktop::Mate, Desktop::Lxqt, Desktop::Lumina]);
    }

    #[test]
    fn plasma_adds_kate() {
        assert!(Desktop::Plasma5.extra_packages().contains("      kate\n"));
        assert!(Desktop::Plasma6.extra_packages().contains("kdePackages.kate"));
        assert_eq!(Desktop::Xfce.extra_packages(), DEFAULT_EXTRA_PACKAGES);
    }
}
