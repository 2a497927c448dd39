//! Unbounded FIFO channel between processes.
//!
//! A [`Channel`] buffers messages without limit. [`Channel::put()`] never
//! blocks, while [`Channel::get()`] suspends the calling process until a
//! message is available. Messages are delivered in insertion order, and
//! waiting receivers are served in the order in which they started waiting.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// A receiver suspended on an empty channel.
struct Receiver<T> {
    message: RefCell<Option<T>>,
    waker: RefCell<Option<Waker>>,
}

struct Inner<T> {
    buffer: VecDeque<T>,
    receivers: VecDeque<Rc<Receiver<T>>>,
}

impl<T> Inner<T> {
    /// Delivers a message to the oldest waiting receiver or buffers it.
    ///
    /// The waker of the receiver, if any, is returned so that it can be woken
    /// once the borrow of the channel state has ended.
    fn deliver(&mut self, message: T) -> Option<Waker> {
        match self.receivers.pop_front() {
            Some(receiver) => {
                *receiver.message.borrow_mut() = Some(message);
                let waker = receiver.waker.borrow_mut().take();

                waker
            }
            None => {
                self.buffer.push_back(message);

                None
            }
        }
    }
}

/// An unbounded, multi-producer, multi-consumer FIFO mailbox.
///
/// Cloning a `Channel` creates another handle to the same channel.
pub struct Channel<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Channel<T> {
    /// Creates an empty channel.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                buffer: VecDeque::new(),
                receivers: VecDeque::new(),
            })),
        }
    }

    /// Sends a message.
    ///
    /// If a receiver is waiting, the message is handed over to the oldest one
    /// and that receiver is resumed at the current simulation time. Otherwise
    /// the message is buffered.
    pub fn put(&self, message: T) {
        let waker = self.inner.borrow_mut().deliver(message);
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Receives the oldest message.
    ///
    /// The returned future resolves immediately if a message is buffered.
    pub fn get(&self) -> Get<T> {
        Get {
            inner: self.inner.clone(),
            receiver: None,
        }
    }

    /// Returns the number of buffered messages.
    pub fn len(&self) -> usize {
        self.inner.borrow().buffer.len()
    }

    /// Returns `true` if no message is buffered.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().buffer.is_empty()
    }

    /// Returns the number of receivers waiting for a message.
    pub fn waiting_receivers(&self) -> usize {
        self.inner.borrow().receivers.len()
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();

        f.debug_struct("Channel")
            .field("len", &inner.buffer.len())
            .field("waiting_receivers", &inner.receivers.len())
            .finish()
    }
}

/// Future returned by [`Channel::get()`].
pub struct Get<T> {
    inner: Rc<RefCell<Inner<T>>>,
    receiver: Option<Rc<Receiver<T>>>,
}

impl<T> Future for Get<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();

        if let Some(receiver) = &this.receiver {
            let message = receiver.message.borrow_mut().take();
            if let Some(message) = message {
                this.receiver = None;

                return Poll::Ready(message);
            }
            *receiver.waker.borrow_mut() = Some(cx.waker().clone());

            return Poll::Pending;
        }

        let mut inner = this.inner.borrow_mut();
        if let Some(message) = inner.buffer.pop_front() {
            return Poll::Ready(message);
        }

        let receiver = Rc::new(Receiver {
            message: RefCell::new(None),
            waker: RefCell::new(Some(cx.waker().clone())),
        });
        inner.receivers.push_back(receiver.clone());
        drop(inner);
        this.receiver = Some(receiver);

        Poll::Pending
    }
}

impl<T> Drop for Get<T> {
    fn drop(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            let message = receiver.message.borrow_mut().take();
            match message {
                // A message was delivered but never claimed: it goes to the
                // next receiver, or back to the head of the buffer.
                Some(message) => {
                    let mut inner = self.inner.borrow_mut();
                    let waker = match inner.receivers.pop_front() {
                        Some(next) => {
                            *next.message.borrow_mut() = Some(message);
                            let waker = next.waker.borrow_mut().take();

                            waker
                        }
                        None => {
                            inner.buffer.push_front(message);

                            None
                        }
                    };
                    drop(inner);
                    if let Some(waker) = waker {
                        waker.wake();
                    }
                }
                None => {
                    self.inner
                        .borrow_mut()
                        .receivers
                        .retain(|waiting| !Rc::ptr_eq(waiting, &receiver));
                }
            }
        }
    }
}

impl<T> fmt::Debug for Get<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Get")
            .field("is_waiting", &self.receiver.is_some())
            .finish_non_exhaustive()
    }
}
