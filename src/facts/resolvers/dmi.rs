//! DMI (SMBIOS) facts read from `/sys/class/dmi/id`

use crate::facts::names;
use crate::facts::{FactError, HostContext, Resolution, Resolver};
use tracing::debug;

const DMI_FILES: &[(&str, &str)] = &[
    (names::BIOS_VENDOR, "/sys/class/dmi/id/bios_vendor"),
    (names::BIOS_VERSION, "/sys/class/dmi/id/bios_version"),
    (names::BIOS_RELEASE_DATE, "/sys/class/dmi/id/bios_date"),
    (names::BOARD_ASSET_TAG, "/sys/class/dmi/id/board_asset_tag"),
    (names::BOARD_MANUFACTURER, "/sys/class/dmi/id/board_vendor"),
    (names::BOARD_PRODUCT_NAME, "/sys/class/dmi/id/board_name"),
    (names::BOARD_SERIAL_NUMBER, "/sys/class/dmi/id/board_serial"),
    (names::CHASSIS_ASSET_TAG, "/sys/class/dmi/id/chassis_asset_tag"),
    (names::MANUFACTURER, "/sys/class/dmi/id/sys_vendor"),
    (names::PRODUCT_NAME, "/sys/class/dmi/id/product_name"),
    (names::SERIAL_NUMBER, "/sys/class/dmi/id/product_serial"),
    (names::PRODUCT_UUID, "/sys/class/dmi/id/product_uuid"),
    (names::CHASSIS_TYPE, "/sys/class/dmi/id/chassis_type"),
];

pub struct DmiResolver {
    host: HostContext,
}

impl DmiResolver {
    pub fn new(host: HostContext) -> Self {
        Self { host }
    }
}

impl Resolver for DmiResolver {
    fn name(&self) -> &'static str {
        "desktop management interface"
    }

    fn names(&self) -> &[&'static str] {
        &[
            names::BIOS_VENDOR,
            names::BIOS_VERSION,
            names::BIOS_RELEASE_DATE,
            names::BOARD_ASSET_TAG,
            names::BOARD_MANUFACTURER,
            names::BOARD_PRODUCT_NAME,
            names::BOARD_SERIAL_NUMBER,
            names::CHASSIS_ASSET_TAG,
            names::MANUFACTURER,
            names::PRODUCT_NAME,
            names::SERIAL_NUMBER,
            names::PRODUCT_UUID,
            names::CHASSIS_TYPE,
        ]
    }

    fn resolve(&self, facts: &mut Resolution<'_>) -> Result<(), FactError> {
        for (name, path) in DMI_FILES {
            if !self.host.root.is_file(path) {
                debug!("{path}: {name} fact is unavailable");
                continue;
            }
            // Several of these files are root-only.
            let Some(value) = self.host.root.read_trimmed(path) else {
                debug!("{path}: permission denied: {name} fact is unavailable");
                continue;
            };

            if *name == names::CHASSIS_TYPE {
                facts.add(*name, chassis_description(&value));
            } else {
                facts.add(*name, value);
            }
        }
        Ok(())
    }
}

/// Maps an SMBIOS chassis type code to its description.
pub fn chassis_description(code: &str) -> &'static str {
    match code {
        "1" => "Other",
        "3" => "Desktop",
        "4" => "Low Profile Desktop",
        "5" => "Pizza Box",
        "6" => "Mini Tower",
        "7" => "Tower",
        "8" => "Portable",
        "9" => "Laptop",
        "10" => "Notebook",
        "11" => "Hand Held",
        "12" => "Docking Station",
        "13" => "All in One",
        "14" => "Sub Notebook",
        "15" => "Space-Saving",
        "16" => "Lunch Box",
        "17" => "Main System Chassis",
        "18" => "Expansion Chassis",
        "19" => "SubChassis",
        "20" => "Bus Expansion Chassis",
        "21" => "Peripheral Chassis",
        "22" => "Storage Chassis",
        "23" => "Rack Mount Chassis",
        "24" => "Sealed-Case PC",
        _ => "Unknown",
    }
}
