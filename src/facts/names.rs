//! Stable fact names
//!
//! These keys are a compatibility contract with downstream consumers; never
//! rename one.

// Kernel
pub const KERNEL: &str = "kernel";
pub const KERNEL_RELEASE: &str = "kernelrelease";
pub const KERNEL_VERSION: &str = "kernelversion";
pub const KERNEL_MAJOR_VERSION: &str = "kernelmajversion";

// Operating system
pub const OPERATING_SYSTEM: &str = "operatingsystem";
pub const OS_FAMILY: &str = "osfamily";
pub const OPERATING_SYSTEM_RELEASE: &str = "operatingsystemrelease";
pub const OPERATING_SYSTEM_MAJOR_RELEASE: &str = "operatingsystemmajrelease";
pub const HARDWARE_MODEL: &str = "hardwaremodel";
pub const ARCHITECTURE: &str = "architecture";

// Networking
pub const HOSTNAME: &str = "hostname";
pub const DOMAIN: &str = "domain";
pub const FQDN: &str = "fqdn";
pub const INTERFACES: &str = "interfaces";
pub const IPADDRESS: &str = "ipaddress";
pub const IPADDRESS6: &str = "ipaddress6";
pub const MACADDRESS: &str = "macaddress";
pub const NETMASK: &str = "netmask";
pub const NETWORK: &str = "network";
pub const MTU: &str = "mtu";

// DMI
pub const BIOS_VENDOR: &str = "bios_vendor";
pub const BIOS_VERSION: &str = "bios_version";
pub const BIOS_RELEASE_DATE: &str = "bios_release_date";
pub const BOARD_ASSET_TAG: &str = "boardassettag";
pub const BOARD_MANUFACTURER: &str = "boardmanufacturer";
pub const BOARD_PRODUCT_NAME: &str = "boardproductname";
pub const BOARD_SERIAL_NUMBER: &str = "boardserialnumber";
pub const CHASSIS_ASSET_TAG: &str = "chassisassettag";
pub const MANUFACTURER: &str = "manufacturer";
pub const PRODUCT_NAME: &str = "productname";
pub const SERIAL_NUMBER: &str = "serialnumber";
pub const PRODUCT_UUID: &str = "uuid";
pub const CHASSIS_TYPE: &str = "chassistype";

// Memory
pub const MEMORY: &str = "memory";
pub const MEMORY_SIZE: &str = "memorysize";
pub const MEMORY_FREE: &str = "memoryfree";
pub const MEMORY_SIZE_MB: &str = "memorysize_mb";
pub const MEMORY_FREE_MB: &str = "memoryfree_mb";
pub const SWAP_SIZE: &str = "swapsize";
pub const SWAP_FREE: &str = "swapfree";
pub const SWAP_SIZE_MB: &str = "swapsize_mb";
pub const SWAP_FREE_MB: &str = "swapfree_mb";

// Processors
pub const PROCESSORS: &str = "processors";
pub const PROCESSOR_COUNT: &str = "processorcount";
pub const PHYSICAL_PROCESSOR_COUNT: &str = "physicalprocessorcount";

// Virtualization
pub const VIRTUAL: &str = "virtual";
pub const IS_VIRTUAL: &str = "is_virtual";
