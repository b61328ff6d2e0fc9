//! Function names used as the kind discriminator of RPC envelopes.

pub const REGISTER_APP_INTERFACE: &str = "RegisterAppInterface";
pub const UNREGISTER_APP_INTERFACE: &str = "UnregisterAppInterface";

pub const ON_HMI_STATUS: &str = "OnHMIStatus";
pub const ON_HASH_CHANGE: &str = "OnHashChange";
pub const ON_PERMISSIONS_CHANGE: &str = "OnPermissionsChange";
pub const ON_DRIVER_DISTRACTION: &str = "OnDriverDistraction";
pub const ON_LANGUAGE_CHANGE: &str = "OnLanguageChange";
pub const ON_APP_INTERFACE_UNREGISTERED: &str = "OnAppInterfaceUnregistered";
