//! Standard simulation events.

// VM LIFECYCLE EVENTS /////////////////////////////////////////////////////////////////////////////

pub mod vm {
    use serde::Serialize;

    use dslab_core::Id;

    use crate::core::common::AllocationError;
    use crate::core::vm::VmSpec;

    #[derive(Serialize, Clone)]
    pub struct VmCreateRequest {
        pub vm: VmSpec,
    }

    #[derive(Serialize)]
    pub struct VmCreated {
        pub vm_id: u32,
        pub host_id: u32,
        pub datacenter_id: Id,
    }

    #[derive(Serialize)]
    pub struct VmCreateFailed {
        pub vm_id: u32,
        pub datacenter_id: Id,
        pub reason: AllocationError,
    }

    #[derive(Serialize)]
    pub struct VmCreateRetry {
        pub vm_id: u32,
    }

    #[derive(Serialize)]
    pub struct VmDestroyRequest {
        pub vm_id: u32,
    }

    #[derive(Serialize)]
    pub struct VmDestroyed {
        pub vm_id: u32,
        pub datacenter_id: Id,
    }
}

// CLOUDLET EVENTS /////////////////////////////////////////////////////////////////////////////////

pub mod cloudlet {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;
    use crate::core::vm::VmKey;

    #[derive(Serialize, Clone)]
    pub struct CloudletSubmit {
        pub cloudlet: Cloudlet,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletReturned {
        pub cloudlet: Cloudlet,
    }

    #[derive(Serialize)]
    pub struct CloudletCancelRequest {
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }

    #[derive(Serialize)]
    pub struct VmProcessingUpdate {
        pub vm: VmKey,
    }
}
