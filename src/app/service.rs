//! Application service: the hexagonal core.
//!
//! [`KioskService`] owns the schedule store, alarm engine, power dispatcher
//! and command channel.  It exposes a platform-agnostic API; all I/O flows
//! through port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!     TimePort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │         KioskService          │
//!   DevicePort ◀── │ Store · Scheduler · Power ·   │ ◀─▶ RemoteDocumentPort
//!                  │ CommandChannel                │
//!                  └──────────────────────────────┘
//! ```
//!
//! Every entry point runs to completion before the next one starts, so the
//! evaluator and dispatch never interleave.

use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::config::KioskConfig;
use crate::error::ScheduleError;
use crate::power::{PowerDispatcher, PowerState};
use crate::remote::command::{CommandChannel, CommandExecutor, CommandOutcome};
use crate::remote::document::{
    self, CommandAck, DeviceAssignment, DeviceDocument, DocPath, KioskSettings, assignment_patch,
    idle_slot_patch, registration_patch,
};
use crate::schedule::{ScheduleAction, ScheduleStore, WeeklySchedule};
use crate::scheduler::{ScheduleManager, TodayPlan};
use crate::state::KioskState;

use super::commands::{CommandKind, RemoteCommand};
use super::events::AppEvent;
use super::ports::{
    AlarmId, AlarmRequest, ClockReading, DevicePort, Document, EventSink, RemoteDocumentPort, RemoteError,
    StoragePort,
};

// ───────────────────────────────────────────────────────────────
// KioskService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct KioskService<S> {
    config: KioskConfig,
    state: KioskState<S>,
    store: ScheduleStore<S>,
    channel: CommandChannel<S>,
    scheduler: ScheduleManager,
    power: PowerDispatcher,
    device_id: String,
    /// Keys the tenant assignment.  Defaults to the device id.
    hardware_id: String,
    tenant: String,
    /// Instant of the last schedule evaluation.  Sleep and wake timers
    /// nominally due before it are already reflected in the power state.
    applied_at: Option<NaiveDateTime>,
}

impl<S: StoragePort> KioskService<S> {
    /// Construct the service.  The tenant is read from `state`, falling
    /// back to the configured default, until
    /// [`resolve_tenant`](Self::resolve_tenant) consults the backend.
    ///
    /// Does **not** touch the device; call [`boot`](Self::boot) next.
    pub fn new(config: KioskConfig, state: KioskState<S>, device_id: String) -> Self {
        let tenant = state.company_or(&config.default_tenant);
        Self {
            scheduler: ScheduleManager::from_config(&config),
            power: PowerDispatcher::new(config.wake_retry_delay_ms),
            store: ScheduleStore::new(state.clone()),
            channel: CommandChannel::new(state.clone()),
            config,
            state,
            hardware_id: device_id.clone(),
            device_id,
            tenant,
            applied_at: None,
        }
    }

    /// Key the tenant assignment by `hardware_id` instead of the device id.
    pub fn with_hardware_id(mut self, hardware_id: String) -> Self {
        self.hardware_id = hardware_id;
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Restore from the locally stored schedule: program today's timers
    /// and the day switch, and put the current action into effect.
    pub fn boot(
        &mut self,
        now: ClockReading,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) -> TodayPlan {
        info!(
            "KioskService: booting device {} for tenant '{}'",
            self.device_id, self.tenant
        );
        let plan = self.apply_today(now, hw, sink);
        self.scheduler.schedule_day_switch(now.local, hw);
        sink.emit(&AppEvent::Started(PowerState::for_action(plan.action)));
        plan
    }

    /// Adopt the tenant the backend has assigned to this hardware.
    ///
    /// An existing assignment wins over local state and is persisted,
    /// along with the device id it records.  A missing one is created
    /// from the current tenant.  On error the local tenant stays in force.
    pub async fn resolve_tenant(
        &mut self,
        remote: &impl RemoteDocumentPort,
        now: ClockReading,
    ) -> Result<(), RemoteError> {
        let path = self.assignment_path()?;
        let Some(body) = remote.fetch(&path).await? else {
            info!("KioskService: no assignment at {}, recording '{}'", path, self.tenant);
            remote
                .merge(&path, assignment_patch(&self.tenant, &self.device_id, now.epoch_ms))
                .await?;
            if let Err(e) = self.state.set_company(&self.tenant) {
                warn!("KioskService: tenant not persisted: {}", e);
            }
            return Ok(());
        };

        let assignment = DeviceAssignment::from_body(&body);
        let restored = assignment
            .device_id
            .filter(|id| *id != self.device_id && DocPath::device(&self.tenant, id).is_ok());
        if let Some(id) = restored {
            info!("KioskService: device id '{}' restored from assignment", id);
            if let Err(e) = self.state.set_device_id(&id) {
                warn!("KioskService: device id not persisted: {}", e);
            }
            self.device_id = id;
        }
        match assignment.company {
            Some(company) if DocPath::device(&company, &self.device_id).is_ok() => {
                if company != self.tenant {
                    info!("KioskService: assigned tenant '{}' (was '{}')", company, self.tenant);
                }
                if let Err(e) = self.state.set_company(&company) {
                    warn!("KioskService: tenant not persisted: {}", e);
                }
                self.tenant = company;
            }
            Some(company) => warn!("KioskService: ignoring assigned tenant '{}'", company),
            None => warn!("KioskService: assignment {} has no company", path),
        }
        Ok(())
    }

    /// Merge the identity fields into the device document, seeding an idle
    /// command slot only when the document does not exist yet.
    pub async fn register(
        &self,
        remote: &impl RemoteDocumentPort,
        now: ClockReading,
    ) -> Result<(), RemoteError> {
        let path = self.device_path()?;
        if remote.fetch(&path).await?.is_none() {
            info!("KioskService: creating device document {}", path);
            remote.merge(&path, idle_slot_patch()).await?;
        }
        remote
            .merge(
                &path,
                registration_patch(
                    &self.device_id,
                    &self.tenant,
                    &self.config.device_model,
                    now.epoch_ms,
                ),
            )
            .await
    }

    // ── Schedule ──────────────────────────────────────────────

    /// Persist a new schedule document and re-apply today.
    ///
    /// A malformed document is rejected; the previous copy stays in force
    /// and nothing is reprogrammed.
    pub fn on_schedule_json(
        &mut self,
        json: &str,
        now: ClockReading,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) -> Result<WeeklySchedule, ScheduleError> {
        let schedule = self.store.save(json)?;
        self.apply_today(now, hw, sink);
        Ok(schedule)
    }

    /// Handle a schedule document snapshot.  A missing document or a blank
    /// `fullJson` seeds the default week remotely and locally.
    pub async fn on_schedule_document(
        &mut self,
        doc: Option<&Document>,
        remote: &impl RemoteDocumentPort,
        now: ClockReading,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) -> Result<WeeklySchedule, ScheduleError> {
        if let Some(json) = document::schedule_json(doc) {
            return self.on_schedule_json(json, now, hw, sink);
        }

        let seed = WeeklySchedule::seed().to_json();
        info!("KioskService: schedule document empty, seeding defaults");
        match self.schedule_path() {
            Ok(path) => {
                if let Err(e) = remote
                    .merge(&path, document::schedule_patch(&seed, now.epoch_ms))
                    .await
                {
                    warn!("KioskService: seeding {} failed: {}", path, e);
                }
            }
            Err(e) => warn!("KioskService: no schedule path: {}", e),
        }
        self.on_schedule_json(&seed, now, hw, sink)
    }

    /// A programmed timer fired.
    ///
    /// A sleep or wake whose nominal time precedes the last evaluation is
    /// a catch-up replay of a transition the evaluation already applied,
    /// and is skipped.
    pub fn on_alarm(
        &mut self,
        alarm: AlarmRequest,
        now: ClockReading,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) {
        info!("KioskService: {} fired at {}", alarm.id.tag(), now.local);
        let action = match alarm.id {
            AlarmId::Sleep => ScheduleAction::Sleep,
            AlarmId::Wake => ScheduleAction::Wake,
            AlarmId::DaySwitch => {
                self.apply_today(now, hw, sink);
                self.scheduler.schedule_day_switch(now.local, hw);
                return;
            }
        };
        if self.applied_at.is_some_and(|at| alarm.nominal < at) {
            debug!(
                "KioskService: {} for {} already covered by evaluation",
                alarm.id.tag(),
                alarm.nominal
            );
            return;
        }
        // Failures are logged by the dispatcher; a wake arms its own retry.
        let _ = self.power.apply(action, now.local, hw, sink);
    }

    /// Periodic housekeeping: runs a due wake retry.
    pub fn tick(&mut self, now: ClockReading, hw: &mut impl DevicePort, sink: &mut impl EventSink) {
        let _ = self.power.tick(now.local, hw, sink);
    }

    // ── Display settings ──────────────────────────────────────

    /// Handle a settings document snapshot.  A missing document is seeded
    /// with defaults; a partial one has its absent keys backfilled.  The
    /// levels are applied either way.
    pub async fn on_settings_document(
        &mut self,
        doc: Option<&Document>,
        remote: &impl RemoteDocumentPort,
        now: ClockReading,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) -> KioskSettings {
        let (settings, patch) = match doc {
            Some(doc) => (
                KioskSettings::from_document(doc),
                KioskSettings::backfill_patch(doc),
            ),
            None => {
                info!("KioskService: settings document missing, seeding defaults");
                (KioskSettings::default(), Some(KioskSettings::seed_patch(now.epoch_ms)))
            }
        };

        if let Some(patch) = patch {
            match self.settings_path() {
                Ok(path) => {
                    if let Err(e) = remote.merge(&path, patch).await {
                        warn!("KioskService: writing defaults to {} failed: {}", path, e);
                    }
                }
                Err(e) => warn!("KioskService: no settings path: {}", e),
            }
        }

        if let Err(e) = hw.set_brightness(settings.brightness) {
            warn!("KioskService: brightness {} failed: {}", settings.brightness, e);
        }
        if let Err(e) = hw.set_volume(settings.volume) {
            warn!("KioskService: volume {} failed: {}", settings.volume, e);
        }
        if let Err(e) = self.state.set_volume_locked(settings.volume_locked) {
            warn!("KioskService: volume lock not persisted: {}", e);
        }
        sink.emit(&AppEvent::SettingsApplied(settings));
        settings
    }

    // ── Commands ──────────────────────────────────────────────

    /// Handle a device document snapshot.  `None` (document deleted) is
    /// ignored.
    pub async fn on_device_document(
        &mut self,
        doc: Option<Document>,
        remote: &impl RemoteDocumentPort,
        now: ClockReading,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) -> Option<CommandAck> {
        let doc = DeviceDocument::from_body(doc?);
        let before = self.tenant.clone();

        let mut executor = Executor {
            config: &self.config,
            state: &self.state,
            power: &mut self.power,
            device_id: &self.device_id,
            hardware_id: &self.hardware_id,
            tenant: &mut self.tenant,
            doc: &doc,
            remote,
            hw,
            sink: &mut *sink,
            now,
        };
        let ack = self.channel.handle(&doc, &mut executor, remote, now).await?;

        sink.emit(&AppEvent::CommandHandled(ack.clone()));
        if self.tenant != before {
            sink.emit(&AppEvent::TenantChanged {
                from: before,
                to: self.tenant.clone(),
            });
        }
        Some(ack)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn hardware_id(&self) -> &str {
        &self.hardware_id
    }

    pub fn device_path(&self) -> Result<DocPath, RemoteError> {
        DocPath::device(&self.tenant, &self.device_id)
    }

    pub fn schedule_path(&self) -> Result<DocPath, RemoteError> {
        DocPath::schedule(&self.tenant)
    }

    pub fn settings_path(&self) -> Result<DocPath, RemoteError> {
        DocPath::settings(&self.tenant)
    }

    pub fn assignment_path(&self) -> Result<DocPath, RemoteError> {
        DocPath::assignment(&self.hardware_id)
    }

    pub fn volume_locked(&self) -> bool {
        self.state.volume_locked()
    }

    pub fn power_state(&self) -> Option<PowerState> {
        self.power.state()
    }

    pub fn config(&self) -> &KioskConfig {
        &self.config
    }

    pub fn store(&self) -> &ScheduleStore<S> {
        &self.store
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_today(
        &mut self,
        now: ClockReading,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) -> TodayPlan {
        let plan = self.scheduler.apply_today(&self.store, now.local, hw);
        self.applied_at = Some(now.local);
        sink.emit(&AppEvent::ScheduleApplied {
            day: plan.day,
            entry: plan.entry,
            action: plan.action,
        });
        let _ = self.power.apply(plan.action, now.local, hw, sink);
        plan
    }
}

// ───────────────────────────────────────────────────────────────
// Command execution
// ───────────────────────────────────────────────────────────────

/// Borrowed view of the service used while one command runs.
struct Executor<'a, S, R, H, E> {
    config: &'a KioskConfig,
    state: &'a KioskState<S>,
    power: &'a mut PowerDispatcher,
    device_id: &'a str,
    hardware_id: &'a str,
    tenant: &'a mut String,
    /// Snapshot the command came from.  Copied on a tenant switch.
    doc: &'a DeviceDocument,
    remote: &'a R,
    hw: &'a mut H,
    sink: &'a mut E,
    now: ClockReading,
}

impl<S, R, H, E> CommandExecutor for Executor<'_, S, R, H, E>
where
    S: StoragePort,
    R: RemoteDocumentPort,
    H: DevicePort,
    E: EventSink,
{
    async fn execute(&mut self, command: &RemoteCommand) -> CommandOutcome {
        match &command.kind {
            CommandKind::Sleep => {
                match self
                    .power
                    .apply(ScheduleAction::Sleep, self.now.local, self.hw, self.sink)
                {
                    Ok(()) => CommandOutcome::ok("locked"),
                    Err(e) => CommandOutcome::error(format!("lock failed: {}", e)),
                }
            }
            CommandKind::Wake => {
                match self
                    .power
                    .apply(ScheduleAction::Wake, self.now.local, self.hw, self.sink)
                {
                    Ok(()) => CommandOutcome::ok("woken"),
                    Err(e) => CommandOutcome::error(format!("wake failed: {}", e)),
                }
            }
            CommandKind::Reload => match self.hw.reload() {
                Ok(()) => CommandOutcome::ok("reloaded"),
                Err(e) => CommandOutcome::error(format!("reload failed: {}", e)),
            },
            CommandKind::OpenUrl(None) => CommandOutcome::error("missing url"),
            CommandKind::OpenUrl(Some(url)) => match self.hw.open_url(url) {
                Ok(()) => CommandOutcome::ok("opened url"),
                Err(e) => CommandOutcome::error(format!("open url failed: {}", e)),
            },
            CommandKind::Update(url) => {
                let url = url.as_deref().unwrap_or(&self.config.update_url);
                match self.hw.start_update(url) {
                    Ok(()) => CommandOutcome::ok("update started"),
                    Err(e) => CommandOutcome::error(format!("update failed: {}", e)),
                }
            }
            CommandKind::SetTenant(None) => CommandOutcome::error("missing company"),
            CommandKind::SetTenant(Some(company)) => self.switch_tenant(company).await,
            CommandKind::Ping => CommandOutcome::ok("pong"),
            CommandKind::Unknown(tag) => CommandOutcome::error(format!("unknown command '{}'", tag)),
        }
    }

    fn ack_path(&self) -> Result<DocPath, RemoteError> {
        DocPath::device(self.tenant, self.device_id)
    }
}

impl<S, R, H, E> Executor<'_, S, R, H, E>
where
    S: StoragePort,
    R: RemoteDocumentPort,
    H: DevicePort,
    E: EventSink,
{
    /// Record the new assignment, copy the device document under the new
    /// tenant, persist the tenant and show its landing page.
    async fn switch_tenant(&mut self, company: &str) -> CommandOutcome {
        let path = match DocPath::device(company, self.device_id) {
            Ok(path) => path,
            Err(e) => return CommandOutcome::error(format!("invalid company: {}", e)),
        };
        let assignment = assignment_patch(company, self.device_id, self.now.epoch_ms);
        let recorded = match DocPath::assignment(self.hardware_id) {
            Ok(at) => self.remote.merge(&at, assignment).await,
            Err(e) => Err(e),
        };
        if let Err(e) = recorded {
            return CommandOutcome::error(format!("company switch failed: {}", e));
        }

        let mut body = self.doc.body.clone();
        body.insert("company".into(), company.into());
        if let Err(e) = self.remote.merge(&path, body).await {
            return CommandOutcome::error(format!("company switch failed: {}", e));
        }

        if let Err(e) = self.state.set_company(company) {
            warn!("KioskService: tenant not persisted: {}", e);
        }
        info!("KioskService: tenant '{}' -> '{}'", self.tenant, company);
        company.clone_into(self.tenant);

        let url = self.config.content_url(company, self.device_id);
        if let Err(e) = self.hw.open_url(&url) {
            warn!("KioskService: opening tenant page failed: {}", e);
        }
        CommandOutcome::ok("company switched")
    }
}
