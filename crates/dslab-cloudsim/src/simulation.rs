use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use sugars::{rc, refcell};

use dslab_core::{Id, Simulation, SimulationContext};

use crate::core::broker::Broker;
use crate::core::cloudlet::Cloudlet;
use crate::core::common::InvalidRequest;
use crate::core::config::{cloudlets, vm_specs, SimulationConfig};
use crate::core::datacenter::Datacenter;
use crate::core::host::{Host, HostPool, HostSpec};
use crate::core::vm::VmSpec;
use crate::core::vm_allocation_policy::{vm_allocation_policy_resolver, VmAllocationPolicy};

/// Entry point for building and running a cloud simulation.
pub struct CloudSimulation {
    datacenters: BTreeMap<Id, Rc<RefCell<Datacenter>>>,
    brokers: BTreeMap<Id, Rc<RefCell<Broker>>>,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl CloudSimulation {
    pub fn new(mut sim: Simulation, sim_config: SimulationConfig) -> Self {
        let ctx = sim.create_context("simulation");
        Self {
            datacenters: BTreeMap::new(),
            brokers: BTreeMap::new(),
            sim,
            ctx,
            sim_config: rc!(sim_config),
        }
    }

    /// Creates simulation with datacenters and a single broker (named `broker`) taken from the config.
    ///
    /// Returns the simulation and the broker id.
    pub fn from_config(sim: Simulation, sim_config: SimulationConfig) -> Result<(Self, Id), InvalidRequest> {
        let mut cloud_sim = Self::new(sim, sim_config);
        let config = cloud_sim.sim_config.clone();
        for datacenter in &config.datacenters {
            let policy = vm_allocation_policy_resolver(datacenter.policy())?;
            cloud_sim.add_datacenter(&datacenter.name, datacenter.host_specs()?, policy);
        }
        let broker = cloud_sim.add_broker("broker");
        cloud_sim.submit_vms(broker, vm_specs(&config.vms, broker)?);
        cloud_sim.submit_cloudlets(broker, cloudlets(&config.cloudlets, broker)?);
        Ok((cloud_sim, broker))
    }

    pub fn add_datacenter(
        &mut self,
        name: &str,
        hosts: Vec<HostSpec>,
        vm_allocation_policy: Box<dyn VmAllocationPolicy>,
    ) -> Id {
        let pool: HostPool = hosts.iter().map(Host::new).collect();
        let datacenter = rc!(refcell!(Datacenter::new(
            pool,
            vm_allocation_policy,
            self.sim_config.message_delay,
            self.sim.create_context(name),
        )));
        let id = self.sim.add_handler(name, datacenter.clone());
        self.datacenters.insert(id, datacenter);
        id
    }

    pub fn add_broker(&mut self, name: &str) -> Id {
        let broker = rc!(refcell!(Broker::new(self.sim.create_context(name), &self.sim_config)));
        let id = self.sim.add_handler(name, broker.clone());
        self.brokers.insert(id, broker);
        id
    }

    pub fn submit_vms(&mut self, broker_id: Id, vms: Vec<VmSpec>) {
        if let Some(broker) = self.brokers.get(&broker_id) {
            broker.borrow_mut().submit_vm_list(vms);
        }
    }

    pub fn submit_cloudlets(&mut self, broker_id: Id, cloudlets: Vec<Cloudlet>) {
        if let Some(broker) = self.brokers.get(&broker_id) {
            broker.borrow_mut().submit_cloudlet_list(cloudlets);
        }
    }

    /// Starts all brokers. Brokers without explicitly set datacenters use all datacenters in creation order.
    pub fn start(&mut self) {
        let datacenters: Vec<Id> = self.datacenters.keys().cloned().collect();
        for broker in self.brokers.values() {
            let mut broker = broker.borrow_mut();
            if broker.datacenters().is_empty() {
                broker.set_datacenters(datacenters.clone());
            }
            broker.start();
        }
    }

    /// Starts all brokers and runs the simulation until there are no pending events.
    pub fn run(&mut self) {
        self.start();
        self.sim.step_until_no_events();
    }

    pub fn broker(&self, broker_id: Id) -> Option<Rc<RefCell<Broker>>> {
        self.brokers.get(&broker_id).cloned()
    }

    pub fn datacenter(&self, datacenter_id: Id) -> Option<Rc<RefCell<Datacenter>>> {
        self.datacenters.get(&datacenter_id).cloned()
    }

    pub fn lookup_id(&self, name: &str) -> Id {
        self.sim.lookup_id(name)
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_for_duration(&mut self, time: f64) -> bool {
        self.sim.step_for_duration(time)
    }

    pub fn step_until_no_events(&mut self) {
        self.sim.step_until_no_events();
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }
}
