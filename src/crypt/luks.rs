use crate::cmd::{argv, Runner};
use crate::error::{JobFailure, JobResult};
use crate::host::Host;
use crate::paths;
use crate::storage::Partition;
use crate::template::Template;

/// GRUB cryptodisk only understands pbkdf2 for LUKS2
const KDF_ARGS: [&str; 4] = ["--hash", "sha256", "--pbkdf", "pbkdf2"];

/// Where GRUB needs the keyfile when unlocking `/` or `/boot` itself.
///
/// Only BIOS installs use GRUB cryptodisk; an encrypted `/boot` partition,
/// or an encrypted root without a separate `/boot`, needs the keyfile.
pub fn needs_keyfile(efi: bool, partitions: &[Partition]) -> bool {
    if efi {
        return false;
    }

    let mut root_encrypted = false;
    let mut boot_partition = false;
    let mut boot_encrypted = false;

    for part in partitions {
        match part.mount_point.as_deref() {
            Some("/") => root_encrypted = part.is_luks(),
            Some("/boot") => {
                boot_partition = true;
                boot_encrypted = part.is_luks();
            }
            _ => {}
        }
    }

    (boot_partition && boot_encrypted) || (root_encrypted && !boot_partition)
}

/// Inline line pointing initrd at the keyfile for one mapper
pub fn keyfile_line(mapper: &str) -> String {
    format!(
        "  boot.initrd.luks.devices.\"{}\".keyFile = \"{}\";",
        mapper,
        paths::CRYPTO_KEYFILE
    )
}

/// Inline line declaring an encrypted swap device
pub fn swap_device_line(mapper: &str, uuid: &str) -> String {
    format!(
        "  boot.initrd.luks.devices.\"{}\".device = \"/dev/disk/by-uuid/{}\";",
        mapper, uuid
    )
}

/// Create the keyfile and enrol it in every claimed LUKS partition.
///
/// Keyfile lines are appended to `template` as partitions are enrolled.
pub fn provision_keyfile(
    root: &str,
    partitions: &[Partition],
    template: &mut Template,
    runner: &dyn Runner,
    host: &dyn Host,
) -> JobResult {
    let keyfile = format!("{}{}", root, paths::CRYPTO_KEYFILE);

    create_keyfile(root, &keyfile, runner).map_err(|e| {
        host.error(&format!("Failed to create {}: {}", paths::CRYPTO_KEYFILE, e.details()));
        JobFailure::new(
            format!("Failed to create {}", paths::CRYPTO_KEYFILE),
            "Check if you have enough free space on your partition.",
        )
    })?;

    for part in partitions.iter().filter(|p| p.is_claimed_luks()) {
        let mapper = part.mapper_name();
        template.line(&keyfile_line(mapper));

        enrol_keyfile(part, &keyfile, runner).map_err(|e| {
            let message = format!("Failed to add {} to {}", mapper, paths::CRYPTO_KEYFILE);
            host.error(&format!("{}: {}", message, e.details()));
            JobFailure::new("cryptsetup failed", message)
        })?;
    }

    Ok(())
}

fn create_keyfile(
    root: &str,
    keyfile: &str,
    runner: &dyn Runner,
) -> Result<(), crate::cmd::CommandError> {
    let boot = format!("{}/boot", root);

    runner.run(&argv(["mkdir", "-p", boot.as_str()]), None)?;
    runner.run(&argv(["chmod", "0700", boot.as_str()]), None)?;
    runner.run(
        &argv([
            "dd",
            "bs=512",
            "count=4",
            "if=/dev/random",
            format!("of={}", keyfile).as_str(),
            "iflag=fullblock",
        ]),
        None,
    )?;
    runner.run(&argv(["chmod", "600", keyfile]), None)?;

    Ok(())
}

fn enrol_keyfile(
    part: &Partition,
    keyfile: &str,
    runner: &dyn Runner,
) -> Result<(), crate::cmd::CommandError> {
    let device = part.device.as_deref().unwrap_or_default();
    let passphrase = part.luks_passphrase.as_deref().map(str::as_bytes);

    let mut convert = argv(["cryptsetup", "luksConvertKey"]);
    convert.extend(argv(KDF_ARGS));
    convert.push(device.to_string());
    runner.run(&convert, passphrase)?;

    let mut add = argv(["cryptsetup", "luksAddKey"]);
    add.extend(argv(KDF_ARGS));
    add.push(device.to_string());
    add.push(keyfile.to_string());
    runner.run(&add, passphrase)?;

    Ok(())
}
