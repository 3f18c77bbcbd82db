//! Recording doubles for [`Host`] and [`Runner`]

use std::cell::RefCell;

use tracing::Level;

use crate::cmd::{CommandError, Runner};
use crate::host::Host;

#[derive(Default)]
pub struct RecordingHost {
    pub progress: RefCell<Vec<f64>>,
    pub statuses: RefCell<Vec<String>>,
    pub logs: RefCell<Vec<(Level, String)>>,
}

impl RecordingHost {
    pub fn at(&self, level: Level) -> Vec<String> {
        self.logs
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.at(Level::WARN)
    }

    pub fn errors(&self) -> Vec<String> {
        self.at(Level::ERROR)
    }
}

impl Host for RecordingHost {
    fn set_status(&self, status: &str) {
        self.statuses.borrow_mut().push(status.to_string());
    }

    fn set_progress(&self, fraction: f64) {
        self.progress.borrow_mut().push(fraction);
    }

    fn log(&self, level: Level, message: &str) {
        self.logs.borrow_mut().push((level, message.to_string()));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub argv: Vec<String>,
    pub stdin: Option<String>,
}

impl Call {
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// First argument after the privilege wrapper, if any
    pub fn tool(&self) -> &str {
        match self.argv.first().map(String::as_str) {
            Some("pkexec") => self.argv.get(1).map(String::as_str).unwrap_or_default(),
            _ => self.program(),
        }
    }
}

type Responder = Box<dyn Fn(&[String]) -> Result<String, CommandError>>;

/// Records every command; replies come from `respond` (default: empty success)
pub struct FakeRunner {
    pub calls: RefCell<Vec<Call>>,
    respond: Responder,
    stream_lines: Vec<String>,
    stream_code: Result<i32, ()>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            respond: Box::new(|_| Ok(String::new())),
            stream_lines: Vec::new(),
            stream_code: Ok(0),
        }
    }
}

pub fn failed(program: &str, output: &str) -> CommandError {
    CommandError::Failed {
        program: program.to_string(),
        code: Some(1),
        output: output.to_string(),
    }
}

impl FakeRunner {
    pub fn respond(
        mut self,
        f: impl Fn(&[String]) -> Result<String, CommandError> + 'static,
    ) -> Self {
        self.respond = Box::new(f);
        self
    }

    pub fn stream_output(mut self, lines: &[&str], code: i32) -> Self {
        self.stream_lines = lines.iter().map(|l| l.to_string()).collect();
        self.stream_code = Ok(code);
        self
    }

    /// Make the streamed command fail to start
    pub fn stream_spawn_failure(mut self) -> Self {
        self.stream_code = Err(());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, tool: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.tool() == tool)
            .collect()
    }
}

impl Runner for FakeRunner {
    fn run(&self, argv: &[String], stdin: Option<&[u8]>) -> Result<String, CommandError> {
        self.calls.borrow_mut().push(Call {
            argv: argv.to_vec(),
            stdin: stdin.map(|s| String::from_utf8_lossy(s).into_owned()),
        });
        (self.respond)(argv)
    }

    fn stream(
        &self,
        argv: &[String],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<i32, CommandError> {
        self.calls.borrow_mut().push(Call {
            argv: argv.to_vec(),
            stdin: None,
        });
        match self.stream_code {
            Ok(code) => {
                for line in &self.stream_lines {
                    on_line(line);
                }
                Ok(code)
            }
            Err(()) => Err(CommandError::Spawn {
                program: argv.first().cloned().unwrap_or_default(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

const SNIPPETS: &[(&str, &str)] = &[
    (
        "head",
        "# Edit this configuration file to define what should be installed on\n\
         # your system.\n\n{ config, pkgs, ... }:\n\n{",
    ),
    (
        "imports",
        "  imports =\n    [ # Include the results of the hardware scan.\n      ./hardware-configuration.nix\n    ];",
    ),
    (
        "bootefi",
        "  boot.loader.systemd-boot.enable = true;\n  boot.loader.efi.canTouchEfiVariables = true;",
    ),
    (
        "bootbios",
        "  boot.loader.grub.enable = true;\n  boot.loader.grub.device = \"@@bootdev@@\";",
    ),
    ("bootnone", "  boot.loader.grub.enable = false;"),
    (
        "bootgrubcrypt",
        "  boot.initrd.secrets = {\n    \"/boot/crypto_keyfile.bin\" = null;\n  };\n  boot.loader.grub.enableCryptodisk = true;",
    ),
    ("network", "  networking.hostName = \"@@hostname@@\";"),
    ("networkmanager", "  networking.networkmanager.enable = true;"),
    ("connman", "  services.connman.enable = true;"),
    ("nmapplet", "  programs.nm-applet.enable = true;"),
    ("time", "  time.timeZone = \"@@timezone@@\";"),
    ("locale", "  i18n.defaultLocale = \"@@LANG@@\";"),
    (
        "localeextra",
        "  i18n.extraLocaleSettings = {\n    LC_TIME = \"@@LC_TIME@@\";\n  };",
    ),
    (
        "keymap",
        "  services.xserver.xkb = {\n    layout = \"@@kblayout@@\";\n    variant = \"@@kbvariant@@\";\n  };",
    ),
    ("console", "  console.keyMap = \"@@vconsole@@\";"),
    ("misc", "  services.printing.enable = true;"),
    ("audio", "  services.pipewire.enable = true;"),
    (
        "users",
        "  users.users.@@username@@ = {\n    isNormalUser = true;\n    description = \"@@fullname@@\";\n    extraGroups = [ @@groups@@ ];\n  };",
    ),
    (
        "autologin",
        "  services.displayManager.autoLogin.enable = true;\n  services.displayManager.autoLogin.user = \"@@username@@\";",
    ),
    ("autologingdm", "  systemd.services.\"getty@tty1\".enable = false;"),
    ("autologintty", "  services.getty.autologinUser = \"@@username@@\";"),
    ("firefox", "  programs.firefox.enable = true;"),
    ("unfree", "  nixpkgs.config.allowUnfree = true;"),
    ("pkgs", "  environment.systemPackages = with pkgs; [@@pkgs@@];"),
    ("extra", ""),
    ("tail", "  system.stateVersion = \"@@nixosversion@@\";\n\n}"),
];

/// Module root populated with a default snippet for every name the job uses
pub fn snippet_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let snippets = dir.path().join("defaultConfigs/snippets");

    let desktops = crate::desktop::Desktop::ALL.map(|d| {
        (
            d.snippet(),
            format!("  services.desktop.{}.enable = true;", d.id()),
        )
    });
    let fixed = SNIPPETS.iter().map(|(n, b)| (n.to_string(), b.to_string()));

    for (name, body) in fixed.chain(desktops) {
        let path = snippets.join(format!("{}.snippet", name));
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, body).expect("write snippet");
    }
    dir
}
