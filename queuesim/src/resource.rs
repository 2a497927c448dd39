//! Capacity-limited resource with FIFO admission.
//!
//! A [`Resource`] grants at most `capacity` concurrent holders. Requests that
//! cannot be granted immediately are queued and served strictly in arrival
//! order.
//!
//! Acquisition is scoped: [`Resource::acquire()`] resolves to a
//! [`ResourceGuard`] which releases its slot when dropped. Because a process
//! body is dropped when it completes, fails or is discarded together with its
//! simulation, a slot is released on every exit path of the holding process.
//!
//! # Examples
//!
//! Two processes sharing a single server.
//!
//! ```
//! use queuesim::resource::Resource;
//! use queuesim::simulation::{Scheduler, SchedulingError, Simulation};
//!
//! async fn customer(
//!     scheduler: Scheduler,
//!     server: Resource,
//!     service_time: f64,
//! ) -> Result<(), SchedulingError> {
//!     let _grant = server.acquire().await;
//!     scheduler.timeout(service_time)?.await;
//!
//!     Ok(())
//! }
//!
//! let mut simu = Simulation::new();
//! let server = Resource::new();
//!
//! simu.spawn("c1", customer(simu.scheduler(), server.clone(), 2.0));
//! simu.spawn("c2", customer(simu.scheduler(), server.clone(), 3.0));
//! simu.run();
//!
//! // The second customer had to wait for the first one.
//! assert_eq!(simu.time().as_secs(), 5.0);
//! assert_eq!(server.in_use(), 0);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// A request waiting for a slot.
struct Request {
    is_granted: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

struct Inner {
    capacity: usize,
    in_use: usize,
    waiters: VecDeque<Rc<Request>>,
}

impl Inner {
    /// Frees one slot, handing it over to the oldest waiter if any.
    ///
    /// The waker of the new holder is returned so that it can be woken once
    /// the borrow of the resource state has ended.
    fn release(&mut self) -> Option<Waker> {
        match self.waiters.pop_front() {
            Some(request) => {
                // The slot changes hands: `in_use` is left unchanged.
                request.is_granted.set(true);
                let waker = request.waker.borrow_mut().take();

                waker
            }
            None => {
                debug_assert!(self.in_use > 0);
                self.in_use -= 1;

                None
            }
        }
    }
}

/// Releases one slot of the resource.
fn release_slot(inner: &RefCell<Inner>) {
    let waker = inner.borrow_mut().release();
    if let Some(waker) = waker {
        waker.wake();
    }
}

/// A mutual-exclusion gate with a fixed number of slots and FIFO waiters.
///
/// Cloning a `Resource` creates another handle to the same resource.
#[derive(Clone)]
pub struct Resource {
    inner: Rc<RefCell<Inner>>,
}

impl Resource {
    /// Creates a single-slot resource.
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Creates a resource with the specified number of slots.
    ///
    /// # Panics
    ///
    /// This will panic if the capacity is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "the capacity of a resource cannot be zero");

        Self {
            inner: Rc::new(RefCell::new(Inner {
                capacity,
                in_use: 0,
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Requests a slot.
    ///
    /// The returned future resolves immediately if a slot is free and no other
    /// request is pending; otherwise the request is queued behind all pending
    /// requests. Dropping the future before it resolves withdraws the request.
    pub fn acquire(&self) -> Acquire {
        Acquire {
            inner: self.inner.clone(),
            request: None,
        }
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity
    }

    /// Returns the number of slots currently held.
    pub fn in_use(&self) -> usize {
        self.inner.borrow().in_use
    }

    /// Returns the number of pending requests.
    pub fn queue_len(&self) -> usize {
        self.inner.borrow().waiters.len()
    }
}

impl Default for Resource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();

        f.debug_struct("Resource")
            .field("capacity", &inner.capacity)
            .field("in_use", &inner.in_use)
            .field("queue_len", &inner.waiters.len())
            .finish()
    }
}

/// Future returned by [`Resource::acquire()`].
pub struct Acquire {
    inner: Rc<RefCell<Inner>>,
    request: Option<Rc<Request>>,
}

impl Future for Acquire {
    type Output = ResourceGuard;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<ResourceGuard> {
        let this = self.get_mut();

        if let Some(request) = &this.request {
            if request.is_granted.get() {
                this.request = None;

                return Poll::Ready(ResourceGuard {
                    inner: this.inner.clone(),
                });
            }
            *request.waker.borrow_mut() = Some(cx.waker().clone());

            return Poll::Pending;
        }

        let mut inner = this.inner.borrow_mut();
        if inner.in_use < inner.capacity && inner.waiters.is_empty() {
            inner.in_use += 1;
            drop(inner);

            return Poll::Ready(ResourceGuard {
                inner: this.inner.clone(),
            });
        }

        let request = Rc::new(Request {
            is_granted: Cell::new(false),
            waker: RefCell::new(Some(cx.waker().clone())),
        });
        inner.waiters.push_back(request.clone());
        this.request = Some(request);

        Poll::Pending
    }
}

impl Drop for Acquire {
    fn drop(&mut self) {
        if let Some(request) = self.request.take() {
            if request.is_granted.get() {
                // The slot was handed over but never claimed: pass it on.
                release_slot(&self.inner);
            } else {
                self.inner
                    .borrow_mut()
                    .waiters
                    .retain(|waiter| !Rc::ptr_eq(waiter, &request));
            }
        }
    }
}

impl fmt::Debug for Acquire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquire")
            .field("is_queued", &self.request.is_some())
            .finish_non_exhaustive()
    }
}

/// A held slot of a [`Resource`], released when dropped.
pub struct ResourceGuard {
    inner: Rc<RefCell<Inner>>,
}

impl ResourceGuard {
    /// Releases the slot.
    ///
    /// This is equivalent to dropping the guard.
    pub fn release(self) {}
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        release_slot(&self.inner);
    }
}

impl fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{Scheduler, SchedulingError, Simulation};

    async fn hold(
        scheduler: Scheduler,
        resource: Resource,
        id: usize,
        delay: f64,
        log: Rc<RefCell<Vec<(usize, f64)>>>,
    ) -> Result<(), SchedulingError> {
        scheduler.timeout(delay)?.await;
        let _guard = resource.acquire().await;
        assert!(resource.in_use() <= resource.capacity());
        log.borrow_mut().push((id, scheduler.time().as_secs()));
        scheduler.timeout(1.0)?.await;

        Ok(())
    }

    #[test]
    fn resource_grants_in_request_order() {
        let mut simu = Simulation::new();
        let resource = Resource::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        // Requests arrive at t=0.0, 0.1, 0.2, 0.3 but are spawned out of order.
        for (id, delay) in [(2, 0.2), (0, 0.0), (3, 0.3), (1, 0.1)] {
            simu.spawn(
                format!("holder-{}", id),
                hold(simu.scheduler(), resource.clone(), id, delay, log.clone()),
            );
        }

        simu.run_until(0.5).unwrap();
        assert_eq!(resource.in_use(), 1);
        assert_eq!(resource.queue_len(), 3);

        simu.run();
        assert_eq!(
            *log.borrow(),
            vec![(0, 0.0), (1, 1.0), (2, 2.0), (3, 3.0)]
        );
        assert_eq!(resource.in_use(), 0);
        assert_eq!(resource.queue_len(), 0);
    }

    #[test]
    fn resource_with_capacity() {
        let mut simu = Simulation::new();
        let resource = Resource::with_capacity(2);
        let log = Rc::new(RefCell::new(Vec::new()));

        for id in 0..5 {
            simu.spawn(
                "holder",
                hold(simu.scheduler(), resource.clone(), id, 0.0, log.clone()),
            );
        }
        simu.run();

        assert_eq!(
            *log.borrow(),
            vec![(0, 0.0), (1, 0.0), (2, 1.0), (3, 1.0), (4, 2.0)]
        );
    }

    #[test]
    fn dropped_request_is_withdrawn() {
        let mut simu = Simulation::new();
        let resource = Resource::new();

        let guard = {
            let mut acquire = Box::pin(resource.acquire());
            let waker = futures_task::noop_waker();
            let mut cx = Context::from_waker(&waker);
            match acquire.as_mut().poll(&mut cx) {
                Poll::Ready(guard) => guard,
                Poll::Pending => panic!("a free resource should be granted immediately"),
            }
        };

        // Queue a request, then drop it.
        {
            let mut acquire = Box::pin(resource.acquire());
            let waker = futures_task::noop_waker();
            let mut cx = Context::from_waker(&waker);
            assert!(acquire.as_mut().poll(&mut cx).is_pending());
            assert_eq!(resource.queue_len(), 1);
        }
        assert_eq!(resource.queue_len(), 0);

        guard.release();
        assert_eq!(resource.in_use(), 0);

        // The resource is still usable by processes.
        let log = Rc::new(RefCell::new(Vec::new()));
        simu.spawn("holder", hold(simu.scheduler(), resource.clone(), 0, 0.0, log.clone()));
        simu.run();
        assert_eq!(*log.borrow(), vec![(0, 0.0)]);
    }

    #[test]
    fn granted_but_unclaimed_slot_is_passed_on() {
        let resource = Resource::new();
        let waker = futures_task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut first = Box::pin(resource.acquire());
        let guard = match first.as_mut().poll(&mut cx) {
            Poll::Ready(guard) => guard,
            Poll::Pending => panic!("a free resource should be granted immediately"),
        };

        let mut second = Box::pin(resource.acquire());
        let mut third = Box::pin(resource.acquire());
        assert!(second.as_mut().poll(&mut cx).is_pending());
        assert!(third.as_mut().poll(&mut cx).is_pending());

        // The slot is handed to the second request, which is then dropped.
        drop(guard);
        assert_eq!(resource.in_use(), 1);
        drop(second);
        assert_eq!(resource.in_use(), 1);
        assert_eq!(resource.queue_len(), 0);

        match third.as_mut().poll(&mut cx) {
            Poll::Ready(guard) => drop(guard),
            Poll::Pending => panic!("the slot should have been passed to the third request"),
        }
        assert_eq!(resource.in_use(), 0);
    }

    #[test]
    fn slot_is_released_when_simulation_is_dropped() {
        let resource = Resource::new();

        {
            let mut simu = Simulation::new();
            let log = Rc::new(RefCell::new(Vec::new()));
            simu.spawn("holder", hold(simu.scheduler(), resource.clone(), 0, 0.0, log));
            simu.run_until(0.5).unwrap();
            assert_eq!(resource.in_use(), 1);
        }

        assert_eq!(resource.in_use(), 0);
    }
}
