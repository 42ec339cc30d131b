//! Built-in resolvers, one module per fact domain

pub mod dmi;
pub mod kernel;
pub mod memory;
pub mod networking;
pub mod operating_system;
pub mod processor;
pub mod virtualization;

pub use dmi::DmiResolver;
pub use kernel::KernelResolver;
pub use memory::MemoryResolver;
pub use networking::NetworkingResolver;
pub use operating_system::OperatingSystemResolver;
pub use processor::ProcessorResolver;
pub use virtualization::VirtualizationResolver;
