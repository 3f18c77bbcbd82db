//! Console keymap lookup from systemd's kbd-model-map
//!
//! Rows are `<console keymap> <x11 layout> <x11 model> <x11 variants> <options>`.

/// Parsed kbd-model-map rows
#[derive(Debug, Clone, Default)]
pub struct KeymapTable {
    rows: Vec<Vec<String>>,
}

impl KeymapTable {
    pub fn parse(text: &str) -> Self {
        let rows = text
            .lines()
            .filter(|line| !line.starts_with('#'))
            .map(|line| line.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|row| row.len() >= 2)
            .collect();
        Self { rows }
    }

    /// Pick a console keymap for an X11 layout and variant.
    ///
    /// Among rows for `layout`, the first whose variant column contains
    /// `variant` (`-` when none) wins, else the first row for the layout.
    pub fn resolve(&self, layout: &str, variant: Option<&str>) -> Option<&str> {
        let variant = variant.unwrap_or("-");
        let matching = || self.rows.iter().filter(move |row| row[1] == layout);

        matching()
            .find(|row| row.get(3).is_some_and(|v| v.contains(variant)))
            .or_else(|| matching().next())
            .map(|row| row[0].as_str())
    }
}

/// Whether a resolved keymap should be configured at all
pub fn wants_console_keymap(keymap: &str) -> bool {
    !keymap.is_empty() && keymap != "us"
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
# Generated from system-config-keyboard's model list
# consolelayout\t\txlayout\txmodel\t\txvariant\txoptions
sg\t\t\tch\tpc105\t\tde_nodeadkeys\tterminate:ctrl_alt_bksp
us\t\t\tus\tpc105\t\t-\t\tterminate:ctrl_alt_bksp
de\t\t\tde\tpc105\t\t-\t\tterminate:ctrl_alt_bksp
de-latin1-nodeadkeys\tde\tpc105\t\tnodeadkeys\tterminate:ctrl_alt_bksp
fr-bepo\t\t\tfr\tpc105\t\tbepo\t\tterminate:ctrl_alt_bksp
fr\t\t\tfr\tpc105\t\t-\t\tterminate:ctrl_alt_bksp

";

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let table = KeymapTable::parse(TABLE);
        assert_eq!(table.rows.len(), 6);
    }

    #[test]
    fn variant_match_is_preferred() {
        let table = KeymapTable::parse(TABLE);
        assert_eq!(
            table.resolve("de", Some("nodeadkeys")),
            Some("de-latin1-nodeadkeys")
        );
    }

    #[test]
    fn missing_variant_uses_dash_row() {
        let table = KeymapTable::parse(TABLE);
        assert_eq!(table.resolve("fr", None), Some("fr"));
    }

    #[test]
    fn unmatched_variant_falls_back_to_first_row() {
        let table = KeymapTable::parse(TABLE);
        assert_eq!(table.resolve("fr", Some("azerty-oss")), Some("fr-bepo"));
    }

    #[test]
    fn empty_variant_matches_first_row() {
        let table = KeymapTable::parse(TABLE);
        assert_eq!(table.resolve("de", Some("")), Some("de"));
    }

    #[test]
    fn unknown_layout_resolves_to_none() {
        let table = KeymapTable::parse(TABLE);
        assert_eq!(table.resolve("jp", Some("")), None);
    }

    #[test]
    fn us_is_not_configured() {
        assert!(!wants_console_keymap("us"));
        assert!(!wants_console_keymap(""));
        assert!(wants_console_keymap("de-latin1-nodeadkeys"));
    }
}
