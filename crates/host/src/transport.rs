//! Delivery of value and call data to an external recipient.
//!
//! The transport is the only place the vault hands control to code it does
//! not own. It receives the vault itself as `ctx`, so a recipient may call
//! back into any vault operation before the transfer returns.

use multisig_core::{Amount, CallFailure, Identity, Payload};

/// A transfer the vault has committed to and is now delivering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    /// Ledger index of the transaction being executed.
    pub index: u64,
    pub recipient: Identity,
    pub amount: Amount,
    pub payload: Payload,
}

/// `transferAndInvoke(recipient, amount, payload)`.
///
/// Returning `Err` makes the vault roll back the whole execution.
pub trait Transport<Ctx: ?Sized> {
    fn transfer_and_invoke(&mut self, call: &OutboundCall, ctx: &mut Ctx)
        -> Result<(), CallFailure>;
}

impl<Ctx: ?Sized, T: Transport<Ctx> + ?Sized> Transport<Ctx> for &mut T {
    fn transfer_and_invoke(
        &mut self,
        call: &OutboundCall,
        ctx: &mut Ctx,
    ) -> Result<(), CallFailure> {
        (**self).transfer_and_invoke(call, ctx)
    }
}

impl<Ctx: ?Sized, T: Transport<Ctx> + ?Sized> Transport<Ctx> for Box<T> {
    fn transfer_and_invoke(
        &mut self,
        call: &OutboundCall,
        ctx: &mut Ctx,
    ) -> Result<(), CallFailure> {
        (**self).transfer_and_invoke(call, ctx)
    }
}

/// Accepts every call and does nothing with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl<Ctx: ?Sized> Transport<Ctx> for NullTransport {
    fn transfer_and_invoke(
        &mut self,
        call: &OutboundCall,
        _ctx: &mut Ctx,
    ) -> Result<(), CallFailure> {
        tracing::debug!(index = call.index, recipient = %call.recipient, "null transport: delivered");
        Ok(())
    }
}

type ReentryHook<Ctx> = Box<dyn FnMut(&OutboundCall, &mut Ctx) -> Result<(), CallFailure> + Send>;

/// Records every delivered call. Can be told to reject calls, or to run a
/// hook against the vault mid-delivery to simulate a re-entrant recipient.
pub struct RecordingTransport<Ctx: ?Sized> {
    delivered: Vec<OutboundCall>,
    attempts: usize,
    fail_with: Option<CallFailure>,
    hook: Option<ReentryHook<Ctx>>,
}

impl<Ctx: ?Sized> Default for RecordingTransport<Ctx> {
    fn default() -> Self {
        Self {
            delivered: Vec::new(),
            attempts: 0,
            fail_with: None,
            hook: None,
        }
    }
}

impl<Ctx: ?Sized> RecordingTransport<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call fails with `failure` until [`Self::succeed`].
    pub fn fail_with(mut self, failure: CallFailure) -> Self {
        self.fail_with = Some(failure);
        self
    }

    pub fn succeed(&mut self) {
        self.fail_with = None;
    }

    /// Runs `hook` with the vault before the call is considered delivered.
    pub fn on_call<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&OutboundCall, &mut Ctx) -> Result<(), CallFailure> + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Calls that went through, in delivery order.
    pub fn delivered(&self) -> &[OutboundCall] {
        &self.delivered
    }

    /// All calls seen, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl<Ctx: ?Sized> Transport<Ctx> for RecordingTransport<Ctx> {
    fn transfer_and_invoke(
        &mut self,
        call: &OutboundCall,
        ctx: &mut Ctx,
    ) -> Result<(), CallFailure> {
        self.attempts += 1;
        if let Some(hook) = self.hook.as_mut() {
            hook(call, ctx)?;
        }
        if let Some(failure) = &self.fail_with {
            tracing::debug!(index = call.index, %failure, "recording transport: rejecting");
            return Err(failure.clone());
        }
        self.delivered.push(call.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};

    fn call() -> OutboundCall {
        OutboundCall {
            index: 0,
            recipient: Address::with_last_byte(9),
            amount: U256::from(1u64),
            payload: Bytes::new(),
        }
    }

    #[test]
    fn records_successful_calls() {
        let mut t = RecordingTransport::<()>::new();
        t.transfer_and_invoke(&call(), &mut ()).unwrap();
        assert_eq!(t.delivered(), &[call()]);
        assert_eq!(t.attempts(), 1);
    }

    #[test]
    fn failing_transport_records_attempt_only() {
        let mut t = RecordingTransport::<()>::new().fail_with(CallFailure::Rejected("no".into()));
        assert!(t.transfer_and_invoke(&call(), &mut ()).is_err());
        assert!(t.delivered().is_empty());
        assert_eq!(t.attempts(), 1);

        t.succeed();
        assert!(t.transfer_and_invoke(&call(), &mut ()).is_ok());
    }

    #[test]
    fn hook_sees_context() {
        let mut counter = 0u32;
        let mut t = RecordingTransport::<u32>::new().on_call(|_, ctx| {
            *ctx += 1;
            Ok(())
        });
        t.transfer_and_invoke(&call(), &mut counter).unwrap();
        assert_eq!(counter, 1);
    }
}
