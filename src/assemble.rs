//! Build `configuration.nix` from snippets and global storage
//!
//! Snippets are appended in a fixed order. Later steps may depend on side
//! effects of earlier ones (the LUKS keyfile must exist before the initrd
//! lines reference it), so the order must not change.

use crate::cmd::{argv, Runner};
use crate::config::JobConfig;
use crate::crypt;
use crate::desktop::{Desktop, DEFAULT_EXTRA_PACKAGES};
use crate::error::JobResult;
use crate::host::{Host, Reporter};
use crate::keymap::{self, KeymapTable};
use crate::snippet::SnippetStore;
use crate::storage::GlobalStorage;
use crate::template::Template;

/// Assembled configuration, before substitution
#[derive(Debug)]
pub struct Assembly {
    pub template: Template,
    /// Only free software may end up in the hardware configuration
    pub free_only: bool,
}

pub struct Assembler<'a> {
    gs: &'a GlobalStorage,
    config: &'a JobConfig,
    snippets: SnippetStore,
    runner: &'a dyn Runner,
    host: &'a dyn Host,
}

/// `en_US.UTF-8/UTF-8` -> `en_US.UTF-8`
fn locale_name(value: &str) -> &str {
    value.split('/').next().unwrap_or_default()
}

/// `24.05.20240601.abcdef (Uakari)` -> `24.05`
pub fn short_version(raw: &str) -> String {
    let version = raw.trim().split('.').take(2).collect::<Vec<_>>().join(".");
    version.chars().take(5).collect()
}

impl<'a> Assembler<'a> {
    pub fn new(
        gs: &'a GlobalStorage,
        config: &'a JobConfig,
        runner: &'a dyn Runner,
        host: &'a dyn Host,
    ) -> Self {
        Self {
            gs,
            config,
            snippets: SnippetStore::new(&config.module_root),
            runner,
            host,
        }
    }

    /// Append a snippet; a missing one is logged and contributes nothing
    fn add(&self, t: &mut Template, name: &str) {
        match self.snippets.resolve(name) {
            Ok(text) => t.append(&text),
            Err(e) => self.host.error(&e.to_string()),
        }
    }

    pub fn assemble(&self, reporter: &mut Reporter) -> JobResult<Assembly> {
        let gs = self.gs;
        let mut t = Template::new();

        self.add(&mut t, "head");
        self.add(&mut t, "imports");

        self.bootloader(&mut t);

        // nixos-generate-config does not pick up encrypted swap
        for part in gs.partitions.iter().filter(|p| p.is_encrypted_swap()) {
            t.line(&crypt::swap_device_line(
                part.mapper_name(),
                part.uuid.as_deref().unwrap_or_default(),
            ));
        }

        if crypt::needs_keyfile(gs.is_efi(), &gs.partitions) {
            self.add(&mut t, "bootgrubcrypt");
            reporter.stage("Setting up LUKS", 0.15);
            crypt::provision_keyfile(
                &gs.root_mount_point,
                &gs.partitions,
                &mut t,
                self.runner,
                self.host,
            )?;
        }

        reporter.stage("Configuring NixOS", 0.18);

        self.network(&mut t);
        self.time_and_locale(&mut t);

        if let Some(desktop) = gs.desktop_choice().and_then(Desktop::from_choice) {
            self.add(&mut t, &desktop.snippet());
        }

        self.keyboard(&mut t);

        if gs.desktop_choice().is_some() {
            self.add(&mut t, "misc");
            self.add(&mut t, "audio");
        }

        self.users(&mut t);

        if gs.desktop_choice().is_some() {
            self.add(&mut t, "firefox");
        }

        let free_only = gs.unfree_choice.as_deref() != Some("unfree");
        if !free_only {
            self.add(&mut t, "unfree");
        }

        self.add(&mut t, "pkgs");
        let pkgs = match gs.desktop_choice() {
            Some(choice) => Desktop::from_choice(choice)
                .map(Desktop::extra_packages)
                .unwrap_or(DEFAULT_EXTRA_PACKAGES),
            None => "",
        };
        t.bind("pkgs", pkgs);

        self.add(&mut t, "extra");
        self.add(&mut t, "tail");
        t.bind("nixosversion", short_version(&self.nixos_version()));

        Ok(Assembly {
            template: t,
            free_only,
        })
    }

    fn bootloader(&self, t: &mut Template) {
        let bootdev = self.gs.boot_device();

        if self.gs.is_efi() {
            self.add(t, "bootefi");
        } else if bootdev != "nodev" {
            self.add(t, "bootbios");
            t.bind("bootdev", bootdev);
        } else {
            self.add(t, "bootnone");
        }
    }

    fn network(&self, t: &mut Template) {
        let desktop = self.gs.desktop_choice().and_then(Desktop::from_choice);

        self.add(t, "network");
        if desktop.is_some_and(Desktop::uses_connman) {
            self.add(t, "connman");
        } else {
            self.add(t, "networkmanager");
        }
        if desktop.is_some_and(Desktop::needs_nm_applet) {
            self.add(t, "nmapplet");
        }

        let hostname = self
            .gs
            .hostname
            .as_deref()
            .unwrap_or(&self.config.default_hostname);
        t.bind("hostname", hostname);
    }

    fn time_and_locale(&self, t: &mut Template) {
        let gs = self.gs;

        if let (Some(region), Some(zone)) = (&gs.location_region, &gs.location_zone) {
            self.add(t, "time");
            t.bind("timezone", format!("{}/{}", region, zone));
        }

        let Some(conf) = &gs.locale_conf else { return };
        let mut conf = conf.clone();
        let Some(lang) = conf.remove("LANG") else {
            self.host.error("localeConf has no LANG entry, skipping locale setup");
            return;
        };

        let locale = locale_name(&lang);
        self.add(t, "locale");
        t.bind("LANG", locale);

        if conf.values().any(|v| locale_name(v) != locale) {
            self.add(t, "localeextra");
            for (category, value) in &conf {
                t.bind(category, locale_name(value));
            }
        }
    }

    fn keyboard(&self, t: &mut Template) {
        let gs = self.gs;
        let (Some(layout), Some(variant)) = (&gs.keyboard_layout, &gs.keyboard_variant) else {
            return;
        };

        self.add(t, "keymap");
        t.bind("kblayout", layout.as_str());
        t.bind("kbvariant", variant.as_str());

        if let Some(explicit) = &gs.keyboard_vconsole_keymap {
            self.load_console_keymap(t, explicit.trim());
            return;
        }

        let table = match std::fs::read_to_string(&self.config.keymap_table) {
            Ok(text) => KeymapTable::parse(&text),
            Err(e) => {
                self.host.error(&format!(
                    "Failed to read {}: {}",
                    self.config.keymap_table.display(),
                    e
                ));
                return;
            }
        };

        match table.resolve(layout, Some(variant.as_str())) {
            Some(vconsole) if keymap::wants_console_keymap(vconsole) => {
                self.load_console_keymap(t, vconsole)
            }
            _ => {}
        }
    }

    /// Check the keymap loads on the live system before configuring it
    fn load_console_keymap(&self, t: &mut Template, vconsole: &str) {
        let cmd = self.config.privileged(["loadkeys", vconsole]);

        match self.runner.run(&cmd, None) {
            Ok(_) => {
                self.add(t, "console");
                t.bind("vconsole", vconsole);
            }
            Err(e) => {
                self.host
                    .error(&format!("loadkeys: {}", e.output().unwrap_or(&e.to_string())));
                self.host.error(&format!(
                    "Setting vconsole keymap to {} will fail, using default",
                    vconsole
                ));
            }
        }
    }

    fn users(&self, t: &mut Template) {
        let gs = self.gs;
        let Some(username) = &gs.username else { return };

        self.add(t, "users");
        t.bind("username", username.as_str());
        if let Some(fullname) = &gs.fullname {
            t.bind("fullname", fullname.as_str());
        }
        let groups: Vec<String> = self
            .config
            .user_groups
            .iter()
            .map(|g| format!("\"{}\"", g))
            .collect();
        t.bind("groups", groups.join(" "));

        match (&gs.auto_login_user, gs.desktop_choice()) {
            (Some(_), Some(choice)) => {
                self.add(t, "autologin");
                if Desktop::from_choice(choice) == Some(Desktop::Gnome) {
                    self.add(t, "autologingdm");
                }
            }
            (Some(_), None) => self.add(t, "autologintty"),
            _ => {}
        }
    }

    fn nixos_version(&self) -> String {
        match self.runner.run(&argv(["nixos-version"]), None) {
            Ok(out) => out,
            Err(e) => {
                self.host.error(&format!("Failed to query nixos-version: {}", e));
                String::new()
            }
        }
    }
}
