use crate::error::LimitKind;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

/// A token observed by the interpreter to detect host cancellation.
#[derive(Debug, Clone)]
pub struct InterruptToken {
  interrupted: Arc<AtomicBool>,
}

impl InterruptToken {
  /// Create a new interrupt token + handle pair.
  pub fn new() -> (Self, InterruptHandle) {
    Self::from_shared_flag(Arc::new(AtomicBool::new(false)))
  }

  /// Create an interrupt token + handle pair that shares an externally-owned flag.
  ///
  /// This lets hosts plug an existing cancellation flag straight into the
  /// interpreter without polling glue.
  pub fn from_shared_flag(interrupted: Arc<AtomicBool>) -> (Self, InterruptHandle) {
    (
      Self {
        interrupted: interrupted.clone(),
      },
      InterruptHandle { interrupted },
    )
  }

  pub fn is_interrupted(&self) -> bool {
    self.interrupted.load(Ordering::Relaxed)
  }
}

/// A host handle used to request that a running execution terminates.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
  interrupted: Arc<AtomicBool>,
}

impl InterruptHandle {
  /// Request cooperative termination at the next budget check.
  pub fn interrupt(&self) {
    self.interrupted.store(true, Ordering::Relaxed);
  }
}

/// Per-execution budget: op counter, deadline, cancellation flag.
///
/// ## Tick policy
///
/// The evaluator charges **one tick** at the start of every statement and
/// every expression evaluation, at every function/host call, and explicitly in
/// loop shapes that could otherwise iterate without evaluating any node
/// (`for(;;){}`). Consequently a busy loop terminates within `max_ops` ticks.
///
/// Checks run in a fixed order: ops first, then the cancellation flag, then
/// the deadline (the wall clock is only consulted every `check_time_every`
/// ticks). Cancellation and deadline share [`LimitKind::Timeout`]: a deadline
/// is a cancellation scheduled at a known wall-clock time.
#[derive(Debug)]
pub(crate) struct Budget {
  ops: u64,
  max_ops: u64,
  deadline: Instant,
  check_time_every: u32,
  ticks_since_time_check: u32,
  interrupt: InterruptToken,
}

impl Budget {
  pub fn new(
    max_ops: u64,
    timeout: Duration,
    check_time_every: u32,
    interrupt: InterruptToken,
  ) -> Budget {
    let deadline = Instant::now()
      .checked_add(timeout)
      .unwrap_or_else(|| Instant::now() + Duration::from_secs(u32::MAX as u64));
    Budget {
      ops: 0,
      max_ops,
      deadline,
      check_time_every: check_time_every.max(1),
      ticks_since_time_check: 0,
      interrupt,
    }
  }

  pub fn ops(&self) -> u64 {
    self.ops
  }

  #[inline]
  pub fn tick(&mut self) -> Result<(), LimitKind> {
    self.ops += 1;
    if self.ops > self.max_ops {
      return Err(LimitKind::Ops);
    }

    if self.interrupt.is_interrupted() {
      return Err(LimitKind::Timeout);
    }

    self.ticks_since_time_check += 1;
    if self.ticks_since_time_check >= self.check_time_every {
      self.ticks_since_time_check = 0;
      if Instant::now() >= self.deadline {
        return Err(LimitKind::Timeout);
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn budget(max_ops: u64, timeout: Duration) -> Budget {
    let (token, _handle) = InterruptToken::new();
    Budget::new(max_ops, timeout, 1, token)
  }

  #[test]
  fn ops_budget_trips_after_exact_tick_count() {
    let mut b = budget(3, Duration::from_secs(60));
    assert!(b.tick().is_ok());
    assert!(b.tick().is_ok());
    assert!(b.tick().is_ok());
    assert_eq!(b.tick(), Err(LimitKind::Ops));
  }

  #[test]
  fn deadline_trips_as_timeout() {
    let mut b = budget(u64::MAX, Duration::from_millis(0));
    assert_eq!(b.tick(), Err(LimitKind::Timeout));
  }

  #[test]
  fn interrupt_trips_as_timeout() {
    let (token, handle) = InterruptToken::new();
    let mut b = Budget::new(u64::MAX, Duration::from_secs(60), 1, token);
    assert!(b.tick().is_ok());
    handle.interrupt();
    assert_eq!(b.tick(), Err(LimitKind::Timeout));
  }

  #[test]
  fn ops_check_precedes_deadline_check() {
    let mut b = budget(0, Duration::from_millis(0));
    assert_eq!(b.tick(), Err(LimitKind::Ops));
  }
}
