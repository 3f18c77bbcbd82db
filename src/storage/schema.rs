use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The keys of the host's global storage this job reads.
///
/// Everything except the root mount point may be missing; missing and `null`
/// values both come through as `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStorage {
    pub root_mount_point: String,

    /// `efi` or `bios`
    #[serde(default)]
    pub firmware_type: Option<String>,

    #[serde(default)]
    pub boot_loader: Option<BootLoader>,

    #[serde(default)]
    pub partitions: Vec<Partition>,

    /// Desktop / package set picked in the package chooser
    #[serde(default, rename = "packagechooser_packagechooser")]
    pub package_choice: Option<String>,

    /// `unfree` when the user allowed unfree software
    #[serde(default, rename = "packagechooser_unfree")]
    pub unfree_choice: Option<String>,

    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub location_region: Option<String>,

    #[serde(default)]
    pub location_zone: Option<String>,

    /// `LANG` plus `LC_*` categories, values like `en_US.UTF-8/UTF-8`
    #[serde(default)]
    pub locale_conf: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub keyboard_layout: Option<String>,

    #[serde(default)]
    pub keyboard_variant: Option<String>,

    #[serde(default, rename = "keyboardVConsoleKeymap")]
    pub keyboard_vconsole_keymap: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub fullname: Option<String>,

    #[serde(default)]
    pub auto_login_user: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootLoader {
    #[serde(default)]
    pub install_path: Option<String>,
}

/// One entry of the partitioning step's `partitions` list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    #[serde(default)]
    pub mount_point: Option<String>,

    /// `luks`, `luks2`, or the plain filesystem name
    #[serde(default)]
    pub fs_name: Option<String>,

    #[serde(default)]
    pub claimed: bool,

    #[serde(default)]
    pub device: Option<String>,

    /// Filesystem inside the container, e.g. `linuxswap`
    #[serde(default)]
    pub fs: Option<String>,

    #[serde(default)]
    pub luks_mapper_name: Option<String>,

    #[serde(default)]
    pub uuid: Option<String>,

    #[serde(default)]
    pub luks_passphrase: Option<String>,
}

impl Partition {
    pub fn is_luks(&self) -> bool {
        matches!(self.fs_name.as_deref(), Some("luks") | Some("luks2"))
    }

    /// Claimed by the installer, LUKS-formatted, and backed by a device
    pub fn is_claimed_luks(&self) -> bool {
        self.claimed && self.is_luks() && self.device.is_some()
    }

    pub fn is_encrypted_swap(&self) -> bool {
        self.is_claimed_luks() && self.fs.as_deref() == Some("linuxswap")
    }

    pub fn mapper_name(&self) -> &str {
        self.luks_mapper_name.as_deref().unwrap_or_default()
    }
}

impl GlobalStorage {
    /// Package chooser selection, treating an empty string as unset
    pub fn desktop_choice(&self) -> Option<&str> {
        self.package_choice.as_deref().filter(|c| !c.is_empty())
    }

    /// Bootloader install path, `nodev` when there is none
    pub fn boot_device(&self) -> &str {
        self.boot_loader
            .as_ref()
            .and_then(|b| b.install_path.as_deref())
            .unwrap_or("nodev")
    }

    pub fn is_efi(&self) -> bool {
        self.firmware_type.as_deref() == Some("efi")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn luks(mount: &str, fs: &str) -> Partition {
        Partition {
            mount_point: Some(mount.into()),
            fs_name: Some("luks2".into()),
            claimed: true,
            device: Some("/dev/sda2".into()),
            fs: Some(fs.into()),
            luks_mapper_name: Some("luks-abc".into()),
            uuid: Some("abc".into()),
            luks_passphrase: Some("secret".into()),
        }
    }

    #[test]
    fn claimed_luks_needs_device() {
        let mut part = luks("/", "ext4");
        assert!(part.is_claimed_luks());
        part.device = None;
        assert!(!part.is_claimed_luks());
    }

    #[test]
    fn unclaimed_luks_is_ignored() {
        let mut part = luks("/", "ext4");
        part.claimed = false;
        assert!(part.is_luks());
        assert!(!part.is_claimed_luks());
    }

    #[test]
    fn encrypted_swap_requires_linuxswap() {
        assert!(luks("", "linuxswap").is_encrypted_swap());
        assert!(!luks("/", "ext4").is_encrypted_swap());
    }

    #[test]
    fn boot_device_defaults_to_nodev() {
        let mut gs = GlobalStorage::default();
        assert_eq!(gs.boot_device(), "nodev");
        gs.boot_loader = Some(BootLoader { install_path: None });
        assert_eq!(gs.boot_device(), "nodev");
        gs.boot_loader = Some(BootLoader {
            install_path: Some("/dev/sda".into()),
        });
        assert_eq!(gs.boot_device(), "/dev/sda");
    }

    #[test]
    fn empty_desktop_choice_is_unset() {
        let mut gs = GlobalStorage::default();
        assert_eq!(gs.desktop_choice(), None);
        gs.package_choice = Some(String::new());
        assert_eq!(gs.desktop_choice(), None);
        gs.package_choice = Some("gnome".into());
        assert_eq!(gs.desktop_choice(), Some("gnome"));
    }
}
