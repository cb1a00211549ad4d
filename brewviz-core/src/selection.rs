//! Menu selection state machine.
//!
//! `Idle -> Selected(key) -> DrawerOpen(key) -> Idle`. Hover selects, click
//! toggles the drawer. The machine never touches the scene or the network; it
//! returns [`Effect`]s for the host to carry out. Timers are deadlines in host
//! milliseconds, checked by [`SelectionMachine::poll`]; re-arming a timer
//! replaces its deadline.

use crate::config::{LeavePolicy, ViewerConfig};
use crate::error::SubmitError;
use crate::submit::OrderRequest;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Idle,
    Selected(String),
    DrawerOpen(String),
}

impl ViewState {
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Selected(key) | Self::DrawerOpen(key) => Some(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    HoverEnter(String),
    HoverLeave,
    ViewerEnter,
    ViewerLeave,
    Click(String),
    /// Outside click or drawer handle
    Close,
    Confirm { variant: String, ordered_at: String },
}

/// Work for the host after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ShowCup(String),
    HideViewer,
    Highlight(Option<String>),
    OpenDrawer(String),
    CloseDrawer,
    SubmitOrder(OrderRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Pending,
    Success,
    Error,
}

/// Transient toast shown after an order
#[derive(Debug, Clone, PartialEq)]
pub struct StatusIndicator {
    pub message: String,
    pub tone: StatusTone,
    expires_at: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SelectionMachine {
    state: ViewState,
    shown: Option<String>,
    featured_key: String,
    policy: LeavePolicy,
    hover_leave_ms: f64,
    inactivity_ms: f64,
    status_ms: f64,
    hover_deadline: Option<f64>,
    inactivity_deadline: Option<f64>,
    status: Option<StatusIndicator>,
}

impl SelectionMachine {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            state: ViewState::Idle,
            shown: None,
            featured_key: config.featured_key.clone(),
            policy: config.leave_policy,
            hover_leave_ms: config.hover_leave_ms,
            inactivity_ms: config.inactivity_ms,
            status_ms: config.status_ms,
            hover_deadline: None,
            inactivity_deadline: None,
            status: None,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Drink whose cup the host was last told to show
    pub fn shown(&self) -> Option<&str> {
        self.shown.as_deref()
    }

    pub fn status(&self) -> Option<&StatusIndicator> {
        self.status.as_ref()
    }

    pub fn handle(&mut self, event: UiEvent, now: f64) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            UiEvent::HoverEnter(key) => {
                self.hover_deadline = None;
                if let ViewState::DrawerOpen(open) = &self.state {
                    if *open == key {
                        return effects;
                    }
                    effects.push(Effect::CloseDrawer);
                    self.inactivity_deadline = None;
                }
                self.select(key, &mut effects);
            }
            UiEvent::HoverLeave | UiEvent::ViewerLeave => {
                if matches!(self.state, ViewState::Selected(_)) {
                    self.hover_deadline = Some(now + self.hover_leave_ms);
                }
            }
            UiEvent::ViewerEnter => {
                self.hover_deadline = None;
            }
            UiEvent::Click(key) => {
                self.hover_deadline = None;
                if self.state == ViewState::DrawerOpen(key.clone()) {
                    self.go_idle(&mut effects);
                } else {
                    self.show(&key, &mut effects);
                    effects.push(Effect::Highlight(Some(key.clone())));
                    effects.push(Effect::OpenDrawer(key.clone()));
                    self.inactivity_deadline = Some(now + self.inactivity_ms);
                    self.state = ViewState::DrawerOpen(key);
                }
            }
            UiEvent::Close => {
                if self.state != ViewState::Idle {
                    self.go_idle(&mut effects);
                }
            }
            UiEvent::Confirm { variant, ordered_at } => {
                let ViewState::DrawerOpen(key) = &self.state else {
                    log::debug!("confirm ignored outside an open drawer");
                    return effects;
                };
                effects.push(Effect::SubmitOrder(OrderRequest::new(key.clone(), variant, ordered_at)));
                self.status = Some(StatusIndicator {
                    message: "Placing your order...".to_string(),
                    tone: StatusTone::Pending,
                    expires_at: None,
                });
                self.go_idle(&mut effects);
            }
        }
        effects
    }

    /// Fire any expired timers
    pub fn poll(&mut self, now: f64) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.hover_deadline.is_some_and(|d| now >= d) {
            self.hover_deadline = None;
            self.revert(&mut effects);
        }

        if self.inactivity_deadline.is_some_and(|d| now >= d) {
            self.inactivity_deadline = None;
            if matches!(self.state, ViewState::DrawerOpen(_)) {
                log::debug!("drawer closed after inactivity");
                effects.push(Effect::CloseDrawer);
                self.state = ViewState::Idle;
                self.revert(&mut effects);
            }
        }

        if self
            .status
            .as_ref()
            .and_then(|s| s.expires_at)
            .is_some_and(|d| now >= d)
        {
            self.status = None;
        }

        effects
    }

    /// Record the outcome of an order fired by [`Effect::SubmitOrder`].
    /// Only the indicator changes; the last result to arrive wins.
    pub fn submission_finished(&mut self, result: &Result<(), SubmitError>, now: f64) {
        let (message, tone) = match result {
            Ok(()) => ("Order placed. Enjoy!".to_string(), StatusTone::Success),
            Err(e) => (e.user_message(), StatusTone::Error),
        };
        self.status = Some(StatusIndicator {
            message,
            tone,
            expires_at: Some(now + self.status_ms),
        });
    }

    fn select(&mut self, key: String, effects: &mut Vec<Effect>) {
        self.show(&key, effects);
        effects.push(Effect::Highlight(Some(key.clone())));
        self.state = ViewState::Selected(key);
    }

    fn show(&mut self, key: &str, effects: &mut Vec<Effect>) {
        if self.shown.as_deref() != Some(key) {
            effects.push(Effect::ShowCup(key.to_string()));
            self.shown = Some(key.to_string());
        }
    }

    fn go_idle(&mut self, effects: &mut Vec<Effect>) {
        if matches!(self.state, ViewState::DrawerOpen(_)) {
            effects.push(Effect::CloseDrawer);
        }
        self.inactivity_deadline = None;
        self.hover_deadline = None;
        self.state = ViewState::Idle;
        self.shown = None;
        effects.push(Effect::HideViewer);
        effects.push(Effect::Highlight(None));
    }

    fn revert(&mut self, effects: &mut Vec<Effect>) {
        match self.policy {
            LeavePolicy::RevertToFeatured => {
                let featured = self.featured_key.clone();
                self.select(featured, effects);
            }
            LeavePolicy::Hide => self.go_idle(effects),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::submit::submit_order;
    use crate::submit::tests::RecordingStore;
    use pollster::block_on;

    fn machine(policy: LeavePolicy) -> SelectionMachine {
        SelectionMachine::new(&ViewerConfig {
            leave_policy: policy,
            ..ViewerConfig::default()
        })
    }

    fn hover(key: &str) -> UiEvent {
        UiEvent::HoverEnter(key.to_string())
    }

    fn click(key: &str) -> UiEvent {
        UiEvent::Click(key.to_string())
    }

    #[test]
    fn test_hover_selects_and_shows() {
        let mut m = machine(LeavePolicy::Hide);
        let effects = m.handle(hover("espresso"), 0.0);
        assert_eq!(
            effects,
            vec![
                Effect::ShowCup("espresso".into()),
                Effect::Highlight(Some("espresso".into()))
            ]
        );
        assert_eq!(m.state(), &ViewState::Selected("espresso".into()));

        // Re-entering the same item does not rebuild
        let effects = m.handle(hover("espresso"), 10.0);
        assert!(!effects.iter().any(|e| matches!(e, Effect::ShowCup(_))));
    }

    #[test]
    fn test_hover_leave_hides_after_delay() {
        let mut m = machine(LeavePolicy::Hide);
        m.handle(hover("espresso"), 0.0);
        m.handle(UiEvent::HoverLeave, 100.0);

        assert!(m.poll(399.0).is_empty());
        let effects = m.poll(400.0);
        assert!(effects.contains(&Effect::HideViewer));
        assert_eq!(m.state(), &ViewState::Idle);
    }

    #[test]
    fn test_reentry_cancels_leave_timer() {
        let mut m = machine(LeavePolicy::Hide);
        m.handle(hover("espresso"), 0.0);
        m.handle(UiEvent::HoverLeave, 100.0);
        m.handle(UiEvent::ViewerEnter, 200.0);
        assert!(m.poll(10_000.0).is_empty());
        assert_eq!(m.state(), &ViewState::Selected("espresso".into()));
    }

    #[test]
    fn test_leave_timer_resets_on_retrigger() {
        let mut m = machine(LeavePolicy::Hide);
        m.handle(hover("espresso"), 0.0);
        m.handle(UiEvent::HoverLeave, 0.0);
        m.handle(UiEvent::ViewerLeave, 250.0);
        assert!(m.poll(300.0).is_empty());
        assert!(!m.poll(550.0).is_empty());
    }

    #[test]
    fn test_leave_reverts_to_featured() {
        let mut m = machine(LeavePolicy::RevertToFeatured);
        m.handle(hover("espresso"), 0.0);
        m.handle(UiEvent::HoverLeave, 0.0);
        let effects = m.poll(300.0);
        assert_eq!(
            effects,
            vec![
                Effect::ShowCup("call-the-cops".into()),
                Effect::Highlight(Some("call-the-cops".into()))
            ]
        );
        assert_eq!(m.state(), &ViewState::Selected("call-the-cops".into()));
    }

    #[test]
    fn test_click_toggles_drawer() {
        let mut m = machine(LeavePolicy::Hide);
        let effects = m.handle(click("cortado"), 0.0);
        assert!(effects.contains(&Effect::OpenDrawer("cortado".into())));
        assert!(effects.contains(&Effect::ShowCup("cortado".into())));
        assert_eq!(m.state(), &ViewState::DrawerOpen("cortado".into()));

        let effects = m.handle(click("cortado"), 50.0);
        assert!(effects.contains(&Effect::CloseDrawer));
        assert_eq!(m.state(), &ViewState::Idle);
    }

    #[test]
    fn test_click_other_item_switches_drawer() {
        let mut m = machine(LeavePolicy::Hide);
        m.handle(click("cortado"), 0.0);
        m.handle(click("espresso"), 10.0);
        assert_eq!(m.state(), &ViewState::DrawerOpen("espresso".into()));
        assert_eq!(m.shown(), Some("espresso"));
    }

    #[test]
    fn test_hover_other_item_closes_drawer() {
        let mut m = machine(LeavePolicy::Hide);
        m.handle(click("cortado"), 0.0);

        // Pointer passing back over the open item keeps the drawer
        assert!(m.handle(hover("cortado"), 5.0).is_empty());

        let effects = m.handle(hover("espresso"), 10.0);
        assert_eq!(effects[0], Effect::CloseDrawer);
        assert!(effects.contains(&Effect::ShowCup("espresso".into())));
        assert_eq!(m.state(), &ViewState::Selected("espresso".into()));

        // The drawer's inactivity timer went with it
        assert!(m.poll(40_000.0).is_empty());
    }

    #[test]
    fn test_leaving_open_drawer_keeps_it() {
        let mut m = machine(LeavePolicy::Hide);
        m.handle(click("cortado"), 0.0);
        m.handle(UiEvent::HoverLeave, 20.0);
        assert!(m.poll(1_000.0).is_empty());
        assert_eq!(m.state(), &ViewState::DrawerOpen("cortado".into()));
    }

    #[test]
    fn test_inactivity_reverts_to_featured() {
        let mut m = machine(LeavePolicy::RevertToFeatured);
        m.handle(click("cortado"), 1_000.0);
        assert!(m.poll(30_999.0).is_empty());
        let effects = m.poll(31_000.0);
        assert!(effects.contains(&Effect::CloseDrawer));
        assert!(effects.contains(&Effect::ShowCup("call-the-cops".into())));
        assert_eq!(m.state(), &ViewState::Selected("call-the-cops".into()));
    }

    #[test]
    fn test_inactivity_hides_under_hide_policy() {
        let mut m = machine(LeavePolicy::Hide);
        m.handle(click("cortado"), 0.0);
        let effects = m.poll(30_000.0);
        assert_eq!(effects.iter().filter(|e| **e == Effect::CloseDrawer).count(), 1);
        assert!(effects.contains(&Effect::HideViewer));
        assert_eq!(m.state(), &ViewState::Idle);
        assert_eq!(m.shown(), None);
    }

    #[test]
    fn test_reopening_resets_inactivity() {
        let mut m = machine(LeavePolicy::Hide);
        m.handle(click("cortado"), 0.0);
        m.handle(click("espresso"), 20_000.0);
        assert!(m.poll(30_000.0).is_empty());
        assert!(!m.poll(50_000.0).is_empty());
    }

    #[test]
    fn test_close_from_any_state() {
        let mut m = machine(LeavePolicy::Hide);
        assert!(m.handle(UiEvent::Close, 0.0).is_empty());
        m.handle(hover("espresso"), 0.0);
        assert!(m.handle(UiEvent::Close, 1.0).contains(&Effect::HideViewer));
        assert_eq!(m.state(), &ViewState::Idle);
    }

    #[test]
    fn test_confirm_outside_drawer_is_ignored() {
        let mut m = machine(LeavePolicy::Hide);
        m.handle(hover("espresso"), 0.0);
        let effects = m.handle(
            UiEvent::Confirm {
                variant: "single".into(),
                ordered_at: "2024-05-01T09:30:00Z".into(),
            },
            1.0,
        );
        assert!(effects.is_empty());
        assert!(m.status().is_none());
    }

    #[test]
    fn test_failed_order_still_returns_to_idle() {
        let mut m = machine(LeavePolicy::Hide);
        m.handle(click("espresso"), 0.0);
        let effects = m.handle(
            UiEvent::Confirm {
                variant: "double".into(),
                ordered_at: "2024-05-01T09:30:00Z".into(),
            },
            100.0,
        );
        assert_eq!(m.state(), &ViewState::Idle);
        assert_eq!(m.status().unwrap().tone, StatusTone::Pending);

        let order = effects
            .iter()
            .find_map(|e| match e {
                Effect::SubmitOrder(order) => Some(order.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(order.drink_id, "espresso");
        assert!(effects.contains(&Effect::CloseDrawer));

        let store = RecordingStore::failing(RemoteError::Connectivity("network unreachable".into()));
        let result = block_on(submit_order(Some(&store), &order));
        m.submission_finished(&result, 150.0);

        let status = m.status().unwrap();
        assert_eq!(status.tone, StatusTone::Error);
        assert!(status.message.contains("network unreachable"));
        assert_eq!(m.state(), &ViewState::Idle);

        // Indicator is transient
        m.poll(3_149.0);
        assert!(m.status().is_some());
        m.poll(3_150.0);
        assert!(m.status().is_none());
    }

    #[test]
    fn test_last_result_wins() {
        let mut m = machine(LeavePolicy::Hide);
        m.submission_finished(&Err(RemoteError::Unavailable.into()), 0.0);
        m.submission_finished(&Ok(()), 10.0);
        assert_eq!(m.status().unwrap().tone, StatusTone::Success);
    }
}
