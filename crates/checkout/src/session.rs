//! Checkout session state machine.
//!
//! One checkout session is one spawned driver task. The shell sends
//! [`CheckoutCommand`]s in over a channel and observes [`CheckoutSnapshot`]s
//! out of a watch. Because the driver processes commands sequentially, at
//! most one payment-intent call is ever in flight per session, and because
//! the retry backoff is a timer inside the driver's select loop, a manual
//! retry cancels it and abandoning the session (dropping the handle) kills
//! it - no retry fires after the session is gone.
//!
//! Phases: `LoadingCart -> (CartEmpty | LoadingPayment) ->
//! (PaymentError | PaymentReady) -> Confirming -> (Success | ConfirmError)`.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use marigold_core::{Money, Slot};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{Sleep, sleep};
use tracing::{debug, info, warn};

use crate::api::CommerceApi;
use crate::api::types::{CartMetadata, Region};
use crate::cart::CartLedger;
use crate::context::{CheckoutContext, CheckoutTarget, ContactFields, ShippingFields};
use crate::draft::{CheckoutDraft, DraftStore};
use crate::error::CheckoutError;
use crate::gateway::{IntentGateway, PaymentIntent};
use crate::intent::{PaymentIntentState, RetryPolicy};
use crate::summary::{self, OrderSummary};

/// Delay between a successful confirmation and the redirect, so the
/// success message is guaranteed to be visible.
const REDIRECT_DELAY: Duration = Duration::from_millis(3500);

/// Command channel depth; commands queue while a network call is in flight.
const COMMAND_BUFFER: usize = 16;

/// Public phase of a checkout session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CheckoutPhase {
    /// Fetching cart/booking context and reference data.
    LoadingCart,
    /// The server cart came back empty. Terminal for this session; the
    /// shell redirects away. Not an error.
    CartEmpty,
    /// A payment-intent attempt is in flight or waiting out a backoff.
    LoadingPayment,
    /// Intent creation failed with no automatic retry remaining.
    PaymentError {
        /// User-facing message for the failure class.
        message: String,
        /// Whether the "try again" affordance applies.
        can_retry: bool,
        /// Whether recovery is a fresh sign-in instead.
        requires_login: bool,
    },
    /// The processor issued a client secret; fields may be submitted.
    PaymentReady,
    /// The confirmation request is in flight.
    Confirming,
    /// The order is confirmed and paid.
    Success {
        /// Flips to `true` once the post-success delay has elapsed and
        /// the shell should navigate away.
        redirect_due: bool,
    },
    /// The confirmation was rejected. Terminal for the attempt; the
    /// server's reason is carried verbatim in `message`.
    ConfirmError {
        /// Server-reported reason, shown with a back-to-cart escape hatch.
        message: String,
    },
}

/// Commands a checkout session accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutCommand {
    /// Manual "try again": resets the retry counter, cancels any pending
    /// automatic retry, and issues exactly one new intent attempt.
    RetryPayment,
    /// Replace the contact fields.
    UpdateContact(ContactFields),
    /// Toggle home service; toggling off clears shipping fields.
    SetHomeService(bool),
    /// Replace the shipping fields (only honored while home service is on).
    UpdateShipping(ShippingFields),
    /// Select a bookable slot.
    SelectSlot(Slot),
    /// Submit the confirmation with the processor-side token.
    Confirm {
        /// Token minted by the processor-hosted confirmation UI.
        confirmation_token: String,
    },
}

/// Everything the shell renders about a checkout session.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSnapshot {
    /// Current phase.
    pub phase: CheckoutPhase,
    /// Projected figures for display.
    pub summary: OrderSummary,
    /// Shipping-region reference list (best-effort; may be empty).
    pub regions: Vec<Region>,
    /// Recoverable cart/context-fetch failure banner. Does not block
    /// payment.
    pub cart_banner: Option<String>,
    /// Client secret for the processor-hosted confirmation UI, once ready.
    pub client_secret: Option<String>,
    /// Contact fields as entered so far.
    pub contact: ContactFields,
    /// Whether the home-service toggle is on.
    pub home_service: bool,
    /// Whether the provider offers home service for this booking.
    pub home_service_offered: bool,
    /// Shipping fields, while home service is on.
    pub shipping: Option<ShippingFields>,
    /// Selected slot, for service bookings.
    pub slot: Option<Slot>,
    /// Selectable slots, for service bookings.
    pub slots: Vec<Slot>,
    /// Fields that blocked the last confirmation attempt; empty otherwise.
    pub validation_errors: Vec<String>,
}

impl CheckoutSnapshot {
    fn initial(context: &CheckoutContext) -> Self {
        Self {
            phase: CheckoutPhase::LoadingCart,
            summary: summary::project_booking(Money::ZERO, None),
            regions: Vec::new(),
            cart_banner: None,
            client_secret: None,
            contact: context.contact.clone(),
            home_service: context.home_service,
            home_service_offered: false,
            shipping: context.shipping.clone(),
            slot: context.slot,
            slots: Vec::new(),
            validation_errors: Vec::new(),
        }
    }
}

/// Handle to a running checkout session.
///
/// Dropping the handle abandons the session: the driver task exits and
/// any pending retry or redirect timer dies with it.
#[derive(Debug)]
pub struct CheckoutSession {
    commands: mpsc::Sender<CheckoutCommand>,
    snapshot: watch::Receiver<CheckoutSnapshot>,
}

impl CheckoutSession {
    /// Spawn the driver for one checkout session.
    ///
    /// Any retained draft for `draft_key` hydrates the context before the
    /// first snapshot is published.
    pub fn begin(
        api: Arc<dyn CommerceApi>,
        target: CheckoutTarget,
        drafts: DraftStore,
        draft_key: impl Into<String>,
    ) -> Self {
        Self::begin_with_policy(api, target, drafts, draft_key, RetryPolicy::default())
    }

    /// [`Self::begin`] with an explicit retry policy.
    pub fn begin_with_policy(
        api: Arc<dyn CommerceApi>,
        target: CheckoutTarget,
        drafts: DraftStore,
        draft_key: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        let draft_key = draft_key.into();
        let mut context = CheckoutContext::new(target);
        if let Some(draft) = drafts.load(&draft_key) {
            context.contact = draft.contact;
            context.home_service = draft.home_service;
            context.shipping = draft.shipping;
        }

        let gateway = IntentGateway::new(Arc::clone(&api)).with_policy(policy);

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(CheckoutSnapshot::initial(&context));

        let driver = Driver {
            api,
            gateway,
            drafts,
            draft_key,
            context,
            ledger: CartLedger::new(),
            metadata: None,
            booking_price: Money::ZERO,
            home_service_offered: false,
            slots: Vec::new(),
            regions: Vec::new(),
            cart_banner: None,
            intent: PaymentIntentState::Absent,
            retries_used: 0,
            phase: CheckoutPhase::LoadingCart,
            validation_errors: Vec::new(),
            snapshot_tx,
        };
        tokio::spawn(driver.run(command_rx));

        Self {
            commands: command_tx,
            snapshot: snapshot_rx,
        }
    }

    /// Send a command. Returns `false` if the session has already ended.
    pub async fn command(&self, command: CheckoutCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// The latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CheckoutSnapshot {
        self.snapshot.borrow().clone()
    }

    /// A watch receiver for observing snapshot changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<CheckoutSnapshot> {
        self.snapshot.clone()
    }
}

type Timer = Option<Pin<Box<Sleep>>>;

/// Resolve when the timer fires; park forever while it is unarmed.
async fn armed(timer: &mut Timer) {
    match timer.as_mut() {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}

struct Driver {
    api: Arc<dyn CommerceApi>,
    gateway: IntentGateway,
    drafts: DraftStore,
    draft_key: String,
    context: CheckoutContext,
    ledger: CartLedger,
    metadata: Option<CartMetadata>,
    booking_price: Money,
    home_service_offered: bool,
    slots: Vec<Slot>,
    regions: Vec<Region>,
    cart_banner: Option<String>,
    intent: PaymentIntentState,
    retries_used: u8,
    phase: CheckoutPhase,
    validation_errors: Vec<String>,
    snapshot_tx: watch::Sender<CheckoutSnapshot>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::Receiver<CheckoutCommand>) {
        let mut retry_timer: Timer = None;
        let mut redirect_timer: Timer = None;

        if !self.load_entry_context(&mut retry_timer).await {
            // Empty cart: terminal for this session. The last snapshot
            // stays readable so the shell can redirect away.
            return;
        }

        loop {
            tokio::select! {
                maybe_command = commands.recv() => match maybe_command {
                    Some(command) => {
                        self.handle_command(command, &mut retry_timer, &mut redirect_timer)
                            .await;
                    }
                    // Session abandoned; pending timers die with the task.
                    None => break,
                },
                () = armed(&mut retry_timer) => {
                    retry_timer = None;
                    self.attempt_intent(&mut retry_timer).await;
                }
                () = armed(&mut redirect_timer) => {
                    redirect_timer = None;
                    if let CheckoutPhase::Success { redirect_due } = &mut self.phase {
                        *redirect_due = true;
                    }
                    self.publish();
                }
            }
        }
    }

    /// Fire the entry fetches concurrently: cart/booking context, region
    /// reference data, and the first payment-intent attempt. Reference
    /// data is best-effort; a context-fetch failure surfaces a banner but
    /// does not block the intent. Returns `false` on an empty cart.
    async fn load_entry_context(&mut self, retry_timer: &mut Timer) -> bool {
        match self.context.target.clone() {
            CheckoutTarget::Cart { .. } => {
                let (cart, regions, intent) = tokio::join!(
                    self.api.fetch_cart(),
                    self.api.fetch_regions(),
                    self.gateway.create_intent(&self.context.target),
                );
                self.apply_regions(regions);
                match cart {
                    Ok(server_cart) => {
                        self.ledger.reconcile(&server_cart);
                        self.metadata = Some(server_cart.metadata);
                        if self.ledger.is_empty() {
                            self.phase = CheckoutPhase::CartEmpty;
                            self.publish();
                            return false;
                        }
                    }
                    Err(error) => {
                        warn!(error = %error, "cart fetch failed; continuing on the intent alone");
                        self.cart_banner = Some(error.user_message());
                    }
                }
                self.apply_intent_outcome(intent, retry_timer);
            }
            CheckoutTarget::Service { service_id } => {
                let (service, regions, intent) = tokio::join!(
                    self.api.fetch_service(&service_id),
                    self.api.fetch_regions(),
                    self.gateway.create_intent(&self.context.target),
                );
                self.apply_regions(regions);
                match service {
                    Ok(detail) => {
                        self.booking_price = detail.price;
                        self.home_service_offered = detail.home_service;
                        self.slots = detail.availability.flatten();
                    }
                    Err(error) => {
                        warn!(error = %error, "service fetch failed; continuing on the intent alone");
                        self.cart_banner = Some(error.user_message());
                    }
                }
                self.apply_intent_outcome(intent, retry_timer);
            }
        }
        true
    }

    fn apply_regions(&mut self, regions: Result<Vec<Region>, CheckoutError>) {
        match regions {
            Ok(regions) => self.regions = regions,
            // Best-effort reference data; the form renders without it.
            Err(error) => warn!(error = %error, "region fetch failed"),
        }
    }

    async fn handle_command(
        &mut self,
        command: CheckoutCommand,
        retry_timer: &mut Timer,
        redirect_timer: &mut Timer,
    ) {
        match command {
            CheckoutCommand::RetryPayment => {
                let payment_failed = matches!(self.phase, CheckoutPhase::PaymentError { .. });
                if payment_failed || retry_timer.is_some() {
                    // Cancel any pending automatic retry so exactly one
                    // create-intent call lands.
                    *retry_timer = None;
                    self.retries_used = 0;
                    self.attempt_intent(retry_timer).await;
                } else {
                    debug!("manual retry ignored outside a failed payment");
                    self.publish();
                }
            }
            CheckoutCommand::UpdateContact(contact) => {
                self.context.contact = contact;
                self.validation_errors.clear();
                self.persist_draft();
                self.publish();
            }
            CheckoutCommand::SetHomeService(enabled) => {
                self.context.set_home_service(enabled);
                self.validation_errors.clear();
                self.persist_draft();
                self.publish();
            }
            CheckoutCommand::UpdateShipping(fields) => {
                if self.context.home_service {
                    self.context.shipping = Some(fields);
                    self.persist_draft();
                } else {
                    debug!("shipping fields ignored while home service is off");
                }
                self.validation_errors.clear();
                self.publish();
            }
            CheckoutCommand::SelectSlot(slot) => {
                self.context.select_slot(slot);
                self.validation_errors.clear();
                self.publish();
            }
            CheckoutCommand::Confirm { confirmation_token } => {
                self.confirm(confirmation_token, redirect_timer).await;
            }
        }
    }

    async fn attempt_intent(&mut self, retry_timer: &mut Timer) {
        self.phase = CheckoutPhase::LoadingPayment;
        self.intent = PaymentIntentState::Pending;
        self.publish();

        let outcome = self.gateway.create_intent(&self.context.target).await;
        self.apply_intent_outcome(outcome, retry_timer);
    }

    fn apply_intent_outcome(
        &mut self,
        outcome: Result<PaymentIntent, CheckoutError>,
        retry_timer: &mut Timer,
    ) {
        match outcome {
            Ok(intent) => {
                self.retries_used = 0;
                self.intent = PaymentIntentState::Ready {
                    client_secret: intent.client_secret.clone(),
                };
                self.context
                    .install_intent(intent.client_secret, intent.checkout_payload);
                self.phase = CheckoutPhase::PaymentReady;
            }
            Err(error) => {
                let policy = self.gateway.policy();
                if policy.should_retry(&error, self.retries_used) {
                    // Transient failures retry silently up to the cap.
                    self.retries_used += 1;
                    let delay = policy.delay_for_retry(self.retries_used);
                    debug!(retry = self.retries_used, ?delay, "scheduling intent retry");
                    *retry_timer = Some(Box::pin(sleep(delay)));
                    self.intent = PaymentIntentState::Pending;
                    self.phase = CheckoutPhase::LoadingPayment;
                } else {
                    self.phase = CheckoutPhase::PaymentError {
                        message: error.user_message(),
                        can_retry: !error.requires_login(),
                        requires_login: error.requires_login(),
                    };
                    self.intent = PaymentIntentState::Failed(error);
                }
            }
        }
        self.publish();
    }

    async fn confirm(&mut self, confirmation_token: String, redirect_timer: &mut Timer) {
        if !self.intent.is_ready() || !matches!(self.phase, CheckoutPhase::PaymentReady) {
            debug!("confirmation ignored outside PaymentReady");
            self.publish();
            return;
        }

        if let Err(error) = self.context.validate_for_confirm() {
            // Known-invalid required fields never reach the network.
            if let CheckoutError::Validation { fields } = &error {
                self.validation_errors = fields.clone();
            }
            self.publish();
            return;
        }
        self.validation_errors.clear();

        self.phase = CheckoutPhase::Confirming;
        self.publish();

        let request = self.context.confirm_request(confirmation_token);
        match self.api.confirm_payment(&request).await {
            Ok(receipt) => {
                info!(order_id = ?receipt.order_id, "checkout confirmed");
                self.drafts.clear(&self.draft_key);
                self.phase = CheckoutPhase::Success {
                    redirect_due: false,
                };
                *redirect_timer = Some(Box::pin(sleep(REDIRECT_DELAY)));
            }
            Err(error) => {
                // Terminal for the attempt: a prior attempt may have
                // partially mutated processor state. Draft is retained.
                self.phase = CheckoutPhase::ConfirmError {
                    message: error.user_message(),
                };
            }
        }
        self.publish();
    }

    fn persist_draft(&self) {
        self.drafts.save(
            &self.draft_key,
            CheckoutDraft {
                contact: self.context.contact.clone(),
                home_service: self.context.home_service,
                shipping: self.context.shipping.clone(),
            },
        );
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(self.snapshot());
    }

    fn snapshot(&self) -> CheckoutSnapshot {
        let summary = match &self.context.target {
            CheckoutTarget::Cart { .. } => {
                summary::project_cart(&self.ledger, self.metadata.as_ref())
            }
            CheckoutTarget::Service { .. } => {
                summary::project_booking(self.booking_price, self.metadata.as_ref())
            }
        };

        CheckoutSnapshot {
            phase: self.phase.clone(),
            summary,
            regions: self.regions.clone(),
            cart_banner: self.cart_banner.clone(),
            client_secret: self.intent.client_secret().map(str::to_owned),
            contact: self.context.contact.clone(),
            home_service: self.context.home_service,
            home_service_offered: self.home_service_offered,
            shipping: self.context.shipping.clone(),
            slot: self.context.slot,
            slots: self.slots.clone(),
            validation_errors: self.validation_errors.clone(),
        }
    }
}
