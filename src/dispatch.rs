// SPDX-License-Identifier: MPL-2.0

//! UI thread scheduling.
//!
//! The player and orchestrator never touch the event loop directly. They see
//! a [`DispatchQueue`] that can tell whether the caller is on the UI thread,
//! post work to it, and hand out single-shot [`FrameTimer`]s whose callbacks
//! run on it.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, ThreadId},
    time::Duration,
};

use calloop::{
    LoopHandle, RegistrationToken, channel,
    timer::{TimeoutAction, Timer},
};

use crate::error::Result;

pub type Task = Box<dyn FnOnce() + Send>;
pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// A single-shot timer. Each `start` schedules exactly one callback after
/// the current interval; the callback re-arms it if it wants another.
pub trait FrameTimer: Send {
    fn set_interval(&mut self, interval: Duration);
    fn start(&mut self);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

pub trait DispatchQueue: Send + Sync {
    /// Whether the calling thread is the one this queue dispatches on.
    fn has_thread_access(&self) -> bool;

    /// Run `task` on the UI thread. Returns `false` if the loop is gone.
    fn enqueue(&self, task: Task) -> bool;

    /// Create a stopped timer whose ticks are delivered on the UI thread.
    fn create_timer(&self, on_tick: TickCallback) -> Box<dyn FrameTimer>;
}

enum Message {
    Task(Task),
    Start {
        id: u64,
        interval: Duration,
        on_tick: TickCallback,
        running: Arc<AtomicBool>,
    },
    Stop {
        id: u64,
    },
}

/// Dispatch queue backed by a calloop event loop.
pub struct LoopQueue {
    sender: Mutex<channel::Sender<Message>>,
    owner: ThreadId,
    next_timer: AtomicU64,
}

impl LoopQueue {
    /// Register the queue's channel with the loop. Must be called on the
    /// thread that dispatches the loop.
    pub fn insert<D: 'static>(handle: &LoopHandle<'static, D>) -> Result<Arc<Self>> {
        let (sender, receiver) = channel::channel::<Message>();
        let timers: Rc<RefCell<HashMap<u64, RegistrationToken>>> = Rc::default();
        let timer_handle = handle.clone();

        handle.insert_source(receiver, move |event, _, _| {
            let channel::Event::Msg(message) = event else {
                return;
            };

            match message {
                Message::Task(task) => task(),

                Message::Start {
                    id,
                    interval,
                    on_tick,
                    running,
                } => {
                    let previous = timers.borrow_mut().remove(&id);
                    if let Some(token) = previous {
                        timer_handle.remove(token);
                    }

                    let registry = Rc::clone(&timers);
                    let inserted = timer_handle.insert_source(
                        Timer::from_duration(interval),
                        move |_, _, _| {
                            registry.borrow_mut().remove(&id);
                            running.store(false, Ordering::Release);
                            on_tick();
                            TimeoutAction::Drop
                        },
                    );

                    match inserted {
                        Ok(token) => {
                            timers.borrow_mut().insert(id, token);
                        }
                        Err(why) => tracing::error!(?why, timer = id, "failed to arm timer"),
                    }
                }

                Message::Stop { id } => {
                    let previous = timers.borrow_mut().remove(&id);
                    if let Some(token) = previous {
                        timer_handle.remove(token);
                    }
                }
            }
        })?;

        Ok(Arc::new(Self {
            sender: Mutex::new(sender),
            owner: thread::current().id(),
            next_timer: AtomicU64::new(0),
        }))
    }

    fn sender(&self) -> channel::Sender<Message> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DispatchQueue for LoopQueue {
    fn has_thread_access(&self) -> bool {
        thread::current().id() == self.owner
    }

    fn enqueue(&self, task: Task) -> bool {
        self.sender().send(Message::Task(task)).is_ok()
    }

    fn create_timer(&self, on_tick: TickCallback) -> Box<dyn FrameTimer> {
        Box::new(LoopTimer {
            id: self.next_timer.fetch_add(1, Ordering::Relaxed),
            interval: Duration::ZERO,
            running: Arc::new(AtomicBool::new(false)),
            on_tick,
            sender: self.sender(),
        })
    }
}

struct LoopTimer {
    id: u64,
    interval: Duration,
    running: Arc<AtomicBool>,
    on_tick: TickCallback,
    sender: channel::Sender<Message>,
}

impl FrameTimer for LoopTimer {
    fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    fn start(&mut self) {
        self.running.store(true, Ordering::Release);
        let message = Message::Start {
            id: self.id,
            interval: self.interval,
            on_tick: Arc::clone(&self.on_tick),
            running: Arc::clone(&self.running),
        };
        if self.sender.send(message).is_err() {
            self.running.store(false, Ordering::Release);
            tracing::warn!(timer = self.id, "event loop closed, timer not started");
        }
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::AcqRel) {
            let _ = self.sender.send(Message::Stop { id: self.id });
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for LoopTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod manual {
    //! Deterministic queue for tests: tasks and timer ticks only run when the
    //! test asks for them.

    use std::{
        collections::VecDeque,
        sync::{
            Arc, Mutex,
            atomic::{AtomicBool, Ordering},
        },
        thread::{self, ThreadId},
        time::Duration,
    };

    use super::{DispatchQueue, FrameTimer, Task, TickCallback};

    pub struct ManualQueue {
        owner: ThreadId,
        tasks: Mutex<VecDeque<Task>>,
        timers: Mutex<Vec<Arc<ManualTimerState>>>,
    }

    pub struct ManualTimerState {
        interval: Mutex<Duration>,
        running: AtomicBool,
        starts: Mutex<Vec<Duration>>,
        on_tick: TickCallback,
    }

    impl ManualTimerState {
        pub fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        /// Intervals the timer was started with, oldest first.
        pub fn starts(&self) -> Vec<Duration> {
            self.starts.lock().unwrap().clone()
        }

        pub fn interval(&self) -> Duration {
            *self.interval.lock().unwrap()
        }
    }

    impl ManualQueue {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                owner: thread::current().id(),
                tasks: Mutex::default(),
                timers: Mutex::default(),
            })
        }

        /// Run every queued task, returning how many ran.
        pub fn run_pending(&self) -> usize {
            let mut ran = 0;
            loop {
                let task = self.tasks.lock().unwrap().pop_front();
                let Some(task) = task else {
                    return ran;
                };
                task();
                ran += 1;
            }
        }

        /// Poll until at least one task ran or `timeout` passes.
        pub fn wait_for_task(&self, timeout: Duration) -> bool {
            let deadline = std::time::Instant::now() + timeout;
            while std::time::Instant::now() < deadline {
                if self.run_pending() > 0 {
                    return true;
                }
                thread::sleep(Duration::from_millis(5));
            }
            false
        }

        pub fn timers(&self) -> Vec<Arc<ManualTimerState>> {
            self.timers.lock().unwrap().clone()
        }

        pub fn latest_timer(&self) -> Option<Arc<ManualTimerState>> {
            self.timers.lock().unwrap().last().cloned()
        }

        /// Expire the most recent timer if it is running.
        pub fn fire(&self) -> bool {
            match self.latest_timer() {
                Some(timer) if timer.running.swap(false, Ordering::SeqCst) => {
                    (timer.on_tick)();
                    true
                }
                _ => false,
            }
        }

        /// Invoke a timer's callback regardless of its state, as a late
        /// delivery from the OS would.
        pub fn force_fire(&self, index: usize) {
            let timer = self.timers.lock().unwrap()[index].clone();
            timer.running.store(false, Ordering::SeqCst);
            (timer.on_tick)();
        }
    }

    impl DispatchQueue for ManualQueue {
        fn has_thread_access(&self) -> bool {
            thread::current().id() == self.owner
        }

        fn enqueue(&self, task: Task) -> bool {
            self.tasks.lock().unwrap().push_back(task);
            true
        }

        fn create_timer(&self, on_tick: TickCallback) -> Box<dyn FrameTimer> {
            let state = Arc::new(ManualTimerState {
                interval: Mutex::new(Duration::ZERO),
                running: AtomicBool::new(false),
                starts: Mutex::default(),
                on_tick,
            });
            self.timers.lock().unwrap().push(Arc::clone(&state));
            Box::new(ManualTimer(state))
        }
    }

    struct ManualTimer(Arc<ManualTimerState>);

    impl FrameTimer for ManualTimer {
        fn set_interval(&mut self, interval: Duration) {
            *self.0.interval.lock().unwrap() = interval;
        }

        fn start(&mut self) {
            let interval = self.0.interval();
            self.0.starts.lock().unwrap().push(interval);
            self.0.running.store(true, Ordering::SeqCst);
        }

        fn stop(&mut self) {
            self.0.running.store(false, Ordering::SeqCst);
        }

        fn is_running(&self) -> bool {
            self.0.is_running()
        }
    }
}
