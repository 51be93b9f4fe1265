//! 挂在主机/服务器上的应用

use std::sync::{Arc, Mutex, MutexGuard};

use crate::addr::NetworkAddress;

/// 节点的接收端：拿到每一条完全解封装后的载荷
pub trait App: Send {
    fn receive(&mut self, source: Option<NetworkAddress>, payload: &[u8]);
}

/// 交给应用的一条载荷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub source: Option<NetworkAddress>,
    pub payload: Vec<u8>,
}

impl Delivery {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// 记录收到的载荷。克隆共享同一份记录，调用方留一个句柄即可查看节点收到了什么。
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    log: Arc<Mutex<Vec<Delivery>>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Delivery>> {
        // 仿真是单线程的，中毒的锁里数据仍然有效
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lock().iter().map(Delivery::text).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl App for Inbox {
    fn receive(&mut self, source: Option<NetworkAddress>, payload: &[u8]) {
        self.lock().push(Delivery {
            source,
            payload: payload.to_vec(),
        });
    }
}
