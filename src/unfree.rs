//! Drop unfree kernel modules from the generated hardware configuration
//!
//! `nixos-generate-config` may list out-of-tree modules such as `broadcom_sta`
//! in `boot.extraModulePackages`. With only free software allowed the build
//! would refuse them, so each one is looked up and removed when unfree.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

use crate::cmd::{argv, Runner};
use crate::host::Host;

static EXTRA_MODULE_PACKAGES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"boot\.extraModulePackages = \[ (.*) \];").expect("valid regex")
});

/// Package references listed in `boot.extraModulePackages`, if assigned
pub fn extra_module_packages(text: &str) -> Option<Vec<&str>> {
    EXTRA_MODULE_PACKAGES.captures(text).map(|caps| {
        caps.get(1)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .split(' ')
            .filter(|p| !p.is_empty())
            .collect()
    })
}

/// `config.boot.kernelPackages.broadcom_sta` -> `broadcom_sta`
pub fn package_attr(reference: &str) -> String {
    reference.split('.').skip(3).collect::<Vec<_>>().join(".")
}

/// Rewrite the `boot.extraModulePackages` line without unfree packages.
///
/// `is_unfree` receives the attribute name below the kernel package set.
/// Returns `None` when the file has no such assignment; otherwise every byte
/// outside the assignment is preserved.
pub fn strip_unfree(text: &str, mut is_unfree: impl FnMut(&str) -> bool) -> Option<String> {
    let packages = extra_module_packages(text)?;

    let kept: String = packages
        .into_iter()
        .filter(|pkg| !is_unfree(&package_attr(pkg)))
        .map(|pkg| format!("{} ", pkg))
        .collect();

    let line = format!("boot.extraModulePackages = [ {}];", kept);
    Some(
        EXTRA_MODULE_PACKAGES
            .replace_all(text, NoExpand(&line))
            .into_owned(),
    )
}

/// Last non-empty line of evaluator output; earlier lines are traces
fn json_result(out: &str) -> Option<&str> {
    out.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Ask nixpkgs whether a kernel module package is marked unfree.
///
/// Evaluation failures keep the package and are logged as warnings.
pub fn query_unfree(attr: &str, runner: &dyn Runner, host: &dyn Host) -> bool {
    let expr = format!(
        "with import <nixpkgs> {{}}; pkgs.linuxKernel.packageAliases.linux_default.{}.meta.unfree",
        attr
    );
    let cmd = argv(["nix-instantiate", "--eval", "--strict", "-E", expr.as_str(), "--json"]);

    match runner.run(&cmd, None) {
        Ok(out) if json_result(&out) == Some("true") => {
            host.warning(&format!(
                "{} is marked as unfree, removing from hardware-configuration.nix",
                attr
            ));
            true
        }
        Ok(_) => false,
        Err(e) => {
            host.warning(&format!("Could not check whether {} is unfree: {}", attr, e));
            false
        }
    }
}
