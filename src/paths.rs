/// Installed location of the module's snippets and auxiliary NixOS modules
pub const MODULE_ROOT: &str = "/run/current-system/sw/lib/calamares/modules/nixos";

/// Layout-to-console-keymap table shipped with systemd
pub const KBD_MODEL_MAP: &str = "/run/current-system/sw/share/systemd/kbd-model-map";

/// Site overrides, checked before the defaults
pub const CUSTOM_CONFIGS: &str = "customConfigs";

/// Built-in snippets and modules
pub const DEFAULT_CONFIGS: &str = "defaultConfigs";

/// File extension of a snippet
pub const SNIPPET_EXT: &str = "snippet";

/// Keyfile used by GRUB cryptodisk, relative to the target root
pub const CRYPTO_KEYFILE: &str = "/boot/crypto_keyfile.bin";

/// Generated configuration, relative to the target root
pub const CONFIGURATION_NIX: &str = "etc/nixos/configuration.nix";

/// Generated hardware configuration, relative to the target root
pub const HARDWARE_CONFIGURATION_NIX: &str = "etc/nixos/hardware-configuration.nix";

/// Destination of copied module trees, relative to the target root
pub const MODULES_DIR: &str = "etc/nixos/modules/";
