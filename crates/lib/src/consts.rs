//! Paths and names shared by the assets.

/// Ignition spec version emitted in every document.
pub const IGNITION_VERSION: &str = "3.2.0";

/// Owner of every file and directory written by the appliance assets.
pub const DEFAULT_OWNER: &str = "root";

pub const REGISTRY_DOMAIN: &str = "registry.appliance.com";
pub const REGISTRY_PORT: u16 = 5000;
pub const REGISTRY_IMAGE: &str = "localhost/registry:latest";
pub const REGISTRY_FILE_PATH: &str = "/usr/local/share/registry/registry.tar";
pub const REGISTRY_ENV_PATH: &str = "/etc/assisted/registry.env";
pub const REGISTRY_DATA_BOOTSTRAP: &str = "/mnt/agentdata/oc-mirror/bootstrap";
pub const REGISTRY_DATA_INSTALL: &str = "/mnt/agentdata/oc-mirror/install";

pub const EXTRA_MANIFEST_PATH: &str = "/etc/assisted/extra-manifests";
pub const CORE_PASS_OVERRIDE_PATH: &str = "/etc/assisted/appliance-override-password-set";
pub const SCRIPTS_BIN_PATH: &str = "/usr/local/bin";

/// Public repository of OpenShift release payloads.
pub const OCP_RELEASE_REPOSITORY: &str = "quay.io/openshift-release-dev/ocp-release";

/// Image in the release payload that carries the CoreOS artifacts.
pub const MACHINE_OS_IMAGE_NAME: &str = "machine-os-images";

pub const RECOVERY_PARTITION_NAME: &str = "agentrecovery";
pub const DATA_PARTITION_NAME: &str = "agentdata";

/// GPT type of the Linux reserved partition, keeps the data partition from being auto-mounted.
pub const RESERVED_PARTITION_GUID: &str = "8DA63339-0007-60C0-C436-083AC8230908";

pub const GRUB_TIMEOUT: u32 = 10;
pub const GRUB_MENU_ENTRY_NAME: &str = "Agent-Based Installer";

pub const RECOVERY_ISO_FILE: &str = "recovery.iso";
pub const DATA_ISO_FILE: &str = "data.iso";
pub const APPLIANCE_IMAGE_FILE: &str = "appliance.raw";
pub const USER_CFG_FILE: &str = "user.cfg";
