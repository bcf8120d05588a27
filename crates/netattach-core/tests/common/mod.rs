//! Test doubles and common utilities for architecture contract tests
//!
//! All fake state lives behind `Arc`s, so cloning a fake shares its
//! counters and scripts with the instance handed to the engine.

#![allow(dead_code)]

use async_trait::async_trait;
use netattach_core::error::{Error, Result};
use netattach_core::model::{
    AttachmentObserved, AttachmentSpec, Direction, PortRange, Protocol, PublicAddress,
    ResourceStatus, Rule,
};
use netattach_core::traits::{AddressClient, AttachmentClient, RuleClient, StatusSource};
use netattach_core::{EngineConfig, EngineEvent, ReconcileEngine};
use std::collections::{BTreeSet, VecDeque};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A fake attachment client with scriptable create failures
#[derive(Clone)]
pub struct FakeAttachmentClient {
    create_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    /// The address_override passed to each create call, in order
    create_overrides: Arc<Mutex<Vec<Option<Ipv4Addr>>>>,
    /// When set, every create fails with this error text
    fail_creates_with: Arc<Mutex<Option<String>>>,
    /// Candidate address accepted despite `fail_creates_with`
    accept_address: Arc<Mutex<Option<Ipv4Addr>>>,
    /// Networks whose delete reports NotFound
    absent_networks: Arc<Mutex<BTreeSet<String>>>,
}

impl FakeAttachmentClient {
    pub fn new() -> Self {
        Self {
            create_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
            update_calls: Arc::new(AtomicUsize::new(0)),
            create_overrides: Arc::new(Mutex::new(Vec::new())),
            fail_creates_with: Arc::new(Mutex::new(None)),
            accept_address: Arc::new(Mutex::new(None)),
            absent_networks: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn create_overrides(&self) -> Vec<Option<Ipv4Addr>> {
        self.create_overrides.lock().unwrap().clone()
    }

    /// Make every create fail with the given raw error text
    pub fn fail_creates_with(&self, text: &str) {
        *self.fail_creates_with.lock().unwrap() = Some(text.to_string());
    }

    /// Accept creates that carry this exact address override
    pub fn accept_address(&self, address: Ipv4Addr) {
        *self.accept_address.lock().unwrap() = Some(address);
    }

    /// Make deletes of this network report NotFound
    pub fn mark_absent(&self, network_id: &str) {
        self.absent_networks
            .lock()
            .unwrap()
            .insert(network_id.to_string());
    }
}

#[async_trait]
impl AttachmentClient for FakeAttachmentClient {
    async fn create(
        &self,
        _instance_id: &str,
        spec: &AttachmentSpec,
        address_override: Option<Ipv4Addr>,
        _cancel: &CancellationToken,
    ) -> Result<AttachmentObserved> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.create_overrides.lock().unwrap().push(address_override);

        let fail = self.fail_creates_with.lock().unwrap().clone();
        if let Some(text) = fail {
            let accepted = *self.accept_address.lock().unwrap();
            if accepted.is_none() || accepted != address_override {
                return Err(Error::api(text));
            }
        }

        Ok(AttachmentObserved {
            network_id: spec.network_id.clone(),
            private_address: address_override.or(spec.address),
            public_address_id: None,
            firewall_group_ids: spec.firewall_group_ids.clone(),
            primary: spec.primary,
        })
    }

    async fn delete(
        &self,
        _instance_id: &str,
        network_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.absent_networks.lock().unwrap().contains(network_id) {
            return Err(Error::not_found(network_id));
        }
        Ok(())
    }

    async fn update_groups(
        &self,
        _instance_id: &str,
        _network_id: &str,
        _firewall_group_ids: &BTreeSet<String>,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(
        &self,
        _instance_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<AttachmentObserved>> {
        Ok(Vec::new())
    }
}

/// A fake address client that records call order
#[derive(Clone)]
pub struct FakeAddressClient {
    /// Entries like "associate:pub-1@net-1" / "disassociate:pub-1"
    log: Arc<Mutex<Vec<String>>>,
    /// When set, associate fails with this conflict message
    conflict_on_associate: Arc<Mutex<Option<String>>>,
}

impl FakeAddressClient {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            conflict_on_associate: Arc::new(Mutex::new(None)),
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Make every associate fail with a conflict
    pub fn conflict_on_associate(&self, message: &str) {
        *self.conflict_on_associate.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl AddressClient for FakeAddressClient {
    async fn associate(
        &self,
        _instance_id: &str,
        network_id: &str,
        address_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(message) = self.conflict_on_associate.lock().unwrap().clone() {
            return Err(Error::conflict(
                "associate",
                address_id,
                Some("other-instance".to_string()),
                message,
            ));
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("associate:{address_id}@{network_id}"));
        Ok(())
    }

    async fn disassociate(
        &self,
        _instance_id: &str,
        address_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("disassociate:{address_id}"));
        Ok(())
    }

    async fn get(&self, address_id: &str, _cancel: &CancellationToken) -> Result<PublicAddress> {
        Ok(PublicAddress {
            id: address_id.to_string(),
            address: None,
            attached_network_id: None,
        })
    }
}

/// A fake rule client with scriptable failures
#[derive(Clone)]
pub struct FakeRuleClient {
    created: Arc<Mutex<Vec<Rule>>>,
    deleted: Arc<Mutex<Vec<Rule>>>,
    fail_deletes_with: Arc<Mutex<Option<String>>>,
    fail_creates_with: Arc<Mutex<Option<String>>>,
}

impl FakeRuleClient {
    pub fn new() -> Self {
        Self {
            created: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            fail_deletes_with: Arc::new(Mutex::new(None)),
            fail_creates_with: Arc::new(Mutex::new(None)),
        }
    }

    pub fn created(&self) -> Vec<Rule> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<Rule> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_deletes_with(&self, text: &str) {
        *self.fail_deletes_with.lock().unwrap() = Some(text.to_string());
    }

    pub fn fail_creates_with(&self, text: &str) {
        *self.fail_creates_with.lock().unwrap() = Some(text.to_string());
    }
}

#[async_trait]
impl RuleClient for FakeRuleClient {
    async fn create(&self, _scope_id: &str, rule: &Rule, _cancel: &CancellationToken) -> Result<()> {
        if let Some(text) = self.fail_creates_with.lock().unwrap().clone() {
            return Err(Error::api(text));
        }
        self.created.lock().unwrap().push(rule.clone());
        Ok(())
    }

    async fn delete(&self, _scope_id: &str, rule: &Rule, _cancel: &CancellationToken) -> Result<()> {
        if let Some(text) = self.fail_deletes_with.lock().unwrap().clone() {
            return Err(Error::api(text));
        }
        self.deleted.lock().unwrap().push(rule.clone());
        Ok(())
    }

    async fn list(&self, _scope_id: &str, _cancel: &CancellationToken) -> Result<Vec<Rule>> {
        Ok(Vec::new())
    }
}

/// A fake status source that plays back a script, then repeats a fallback
#[derive(Clone)]
pub struct FakeStatusSource {
    script: Arc<Mutex<VecDeque<ResourceStatus>>>,
    fallback: ResourceStatus,
    polls: Arc<AtomicUsize>,
}

impl FakeStatusSource {
    /// Always report the same status
    pub fn always(status: ResourceStatus) -> Self {
        Self::script(Vec::new(), status)
    }

    /// Play back `statuses` once, then repeat `fallback`
    pub fn script(statuses: Vec<ResourceStatus>, fallback: ResourceStatus) -> Self {
        Self {
            script: Arc::new(Mutex::new(statuses.into())),
            fallback,
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for FakeStatusSource {
    async fn status(
        &self,
        _resource_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<ResourceStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Build an engine wired to clones of the given fakes
pub fn build_engine(
    attachments: &FakeAttachmentClient,
    addresses: &FakeAddressClient,
    rules: &FakeRuleClient,
    status: &FakeStatusSource,
    config: EngineConfig,
) -> (ReconcileEngine, mpsc::Receiver<EngineEvent>) {
    ReconcileEngine::new(
        Box::new(attachments.clone()),
        Box::new(addresses.clone()),
        Box::new(rules.clone()),
        Box::new(status.clone()),
        config,
    )
    .expect("engine construction succeeds")
}

/// Engine on default config with fresh fakes, returning the fakes too
pub fn default_engine() -> (
    ReconcileEngine,
    mpsc::Receiver<EngineEvent>,
    FakeAttachmentClient,
    FakeAddressClient,
    FakeRuleClient,
    FakeStatusSource,
) {
    let attachments = FakeAttachmentClient::new();
    let addresses = FakeAddressClient::new();
    let rules = FakeRuleClient::new();
    let status = FakeStatusSource::always(ResourceStatus::Active);
    let (engine, events) = build_engine(
        &attachments,
        &addresses,
        &rules,
        &status,
        EngineConfig::default(),
    );
    (engine, events, attachments, addresses, rules, status)
}

/// Shorthand for an ingress TCP rule on a single port
pub fn tcp_rule(port: u16, cidr: &str) -> Rule {
    Rule::new(
        Direction::Ingress,
        Protocol::Tcp,
        PortRange::single(port),
        cidr,
    )
}
