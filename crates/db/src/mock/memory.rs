use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salon_core::{
    availability::VisitLookup,
    booking::{ServiceCatalog, VisitStore},
    errors::{ConfigurationConflict, SalonError, SalonResult},
    interval::Interval,
    models::{
        schedule::{Break, DayOfWeek, WorkingWindow},
        service::Service,
        visit::{Visit, VisitStatus},
    },
    schedule::{validate_break, validate_window_resize, ScheduleModel, ScheduleStore},
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    windows: HashMap<Uuid, WorkingWindow>,
    breaks: HashMap<Uuid, Break>,
    services: HashMap<Uuid, Service>,
    visits: HashMap<Uuid, Visit>,
}

impl State {
    fn window_breaks(&self, window_id: Uuid) -> Vec<Break> {
        self.breaks
            .values()
            .filter(|b| b.window_id == window_id)
            .cloned()
            .collect()
    }

    fn overlapping_visit(&self, candidate: &Visit) -> Option<Uuid> {
        if candidate.status != VisitStatus::Scheduled {
            return None;
        }
        let occupied = candidate.occupied();
        self.visits
            .values()
            .filter(|v| v.id != candidate.id)
            .filter(|v| v.employee_id == candidate.employee_id)
            .filter(|v| v.status == VisitStatus::Scheduled)
            .find(|v| v.occupied().overlaps(&occupied))
            .map(|v| v.id)
    }

    fn commit_visit(&mut self, visit: &Visit) -> SalonResult<Visit> {
        if let Some(existing) = self.overlapping_visit(visit) {
            warn!(
                "Visit {} overlaps scheduled visit {} at commit",
                visit.id, existing
            );
            return Err(SalonError::Conflict(format!(
                "Visit {} overlaps scheduled visit {}",
                visit.id, existing
            )));
        }
        self.visits.insert(visit.id, visit.clone());
        Ok(visit.clone())
    }
}

/// Process-local store holding the same invariants as the PostgreSQL schema:
/// one window per employee and day, breaks inside their window and apart from
/// each other, and no two overlapping scheduled visits per employee at commit
/// time. Every check runs under the write lock that applies the change.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_service(&self, service: Service) -> Service {
        let mut state = self.state.write().await;
        state.services.insert(service.id, service.clone());
        service
    }

    pub async fn visit_count(&self) -> usize {
        self.state.read().await.visits.len()
    }
}

#[async_trait]
impl ScheduleModel for InMemoryStore {
    async fn get_working_window(
        &self,
        employee_id: Uuid,
        day: DayOfWeek,
    ) -> SalonResult<Option<WorkingWindow>> {
        let state = self.state.read().await;
        Ok(state
            .windows
            .values()
            .find(|w| w.employee_id == employee_id && w.day_of_week == day)
            .cloned())
    }

    async fn list_breaks(&self, window_id: Uuid) -> SalonResult<Vec<Break>> {
        let state = self.state.read().await;
        let mut breaks: Vec<Break> = state
            .breaks
            .values()
            .filter(|b| b.window_id == window_id)
            .cloned()
            .collect();
        breaks.sort_by_key(|b| b.start_time);
        Ok(breaks)
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn get_window(&self, id: Uuid) -> SalonResult<Option<WorkingWindow>> {
        Ok(self.state.read().await.windows.get(&id).cloned())
    }

    async fn list_windows(&self, employee_id: Uuid) -> SalonResult<Vec<WorkingWindow>> {
        let state = self.state.read().await;
        let mut windows: Vec<WorkingWindow> = state
            .windows
            .values()
            .filter(|w| w.employee_id == employee_id)
            .cloned()
            .collect();
        windows.sort_by_key(|w| w.day_of_week);
        Ok(windows)
    }

    async fn insert_window(&self, window: &WorkingWindow) -> SalonResult<WorkingWindow> {
        let mut state = self.state.write().await;
        let duplicate = state
            .windows
            .values()
            .any(|w| w.employee_id == window.employee_id && w.day_of_week == window.day_of_week);
        if duplicate {
            return Err(ConfigurationConflict::DuplicateDay.into());
        }
        state.windows.insert(window.id, window.clone());
        Ok(window.clone())
    }

    async fn update_window(&self, window: &WorkingWindow) -> SalonResult<WorkingWindow> {
        let mut state = self.state.write().await;
        let breaks = state.window_breaks(window.id);
        let stored = state.windows.get_mut(&window.id).ok_or_else(|| {
            SalonError::NotFound(format!("Working window with ID {} not found", window.id))
        })?;
        let resized = WorkingWindow {
            start_time: window.start_time,
            end_time: window.end_time,
            ..stored.clone()
        };
        validate_window_resize(&resized, &breaks)?;
        *stored = resized;
        Ok(stored.clone())
    }

    async fn delete_window(&self, id: Uuid) -> SalonResult<()> {
        let mut state = self.state.write().await;
        if state.windows.remove(&id).is_none() {
            return Err(SalonError::NotFound(format!(
                "Working window with ID {} not found",
                id
            )));
        }
        state.breaks.retain(|_, b| b.window_id != id);
        Ok(())
    }

    async fn get_break(&self, id: Uuid) -> SalonResult<Option<Break>> {
        Ok(self.state.read().await.breaks.get(&id).cloned())
    }

    async fn insert_break(&self, brk: &Break) -> SalonResult<Break> {
        let mut state = self.state.write().await;
        let window = state.windows.get(&brk.window_id).ok_or_else(|| {
            SalonError::NotFound(format!("Working window with ID {} not found", brk.window_id))
        })?;
        if let Err(conflict) = validate_break(window, brk, &state.window_breaks(brk.window_id)) {
            warn!("Break {} rejected at commit: {}", brk.id, conflict);
            return Err(conflict.into());
        }
        state.breaks.insert(brk.id, brk.clone());
        Ok(brk.clone())
    }

    async fn delete_break(&self, id: Uuid) -> SalonResult<()> {
        let mut state = self.state.write().await;
        state
            .breaks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| SalonError::NotFound(format!("Break with ID {} not found", id)))
    }

    async fn delete_employee_schedule(&self, employee_id: Uuid) -> SalonResult<u64> {
        let mut state = self.state.write().await;
        let window_ids: Vec<Uuid> = state
            .windows
            .values()
            .filter(|w| w.employee_id == employee_id)
            .map(|w| w.id)
            .collect();
        state.breaks.retain(|_, b| !window_ids.contains(&b.window_id));
        for id in &window_ids {
            state.windows.remove(id);
        }
        Ok(window_ids.len() as u64)
    }
}

#[async_trait]
impl VisitLookup for InMemoryStore {
    async fn find_scheduled_visits(
        &self,
        employee_id: Uuid,
        range: Interval<DateTime<Utc>>,
    ) -> SalonResult<Vec<Visit>> {
        let state = self.state.read().await;
        let mut visits: Vec<Visit> = state
            .visits
            .values()
            .filter(|v| v.employee_id == employee_id)
            .filter(|v| v.status == VisitStatus::Scheduled)
            .filter(|v| v.occupied().overlaps(&range))
            .cloned()
            .collect();
        visits.sort_by_key(|v| v.start_time);
        Ok(visits)
    }
}

#[async_trait]
impl VisitStore for InMemoryStore {
    async fn get_visit(&self, id: Uuid) -> SalonResult<Option<Visit>> {
        Ok(self.state.read().await.visits.get(&id).cloned())
    }

    async fn insert_visit(&self, visit: &Visit) -> SalonResult<Visit> {
        self.state.write().await.commit_visit(visit)
    }

    async fn update_visit(&self, visit: &Visit) -> SalonResult<Visit> {
        let mut state = self.state.write().await;
        if !state.visits.contains_key(&visit.id) {
            return Err(SalonError::NotFound(format!(
                "Visit with ID {} not found",
                visit.id
            )));
        }
        state.commit_visit(visit)
    }

    async fn delete_visit(&self, id: Uuid) -> SalonResult<()> {
        let mut state = self.state.write().await;
        state
            .visits
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| SalonError::NotFound(format!("Visit with ID {} not found", id)))
    }
}

#[async_trait]
impl ServiceCatalog for InMemoryStore {
    async fn get_service(&self, id: Uuid) -> SalonResult<Option<Service>> {
        Ok(self.state.read().await.services.get(&id).cloned())
    }
}
