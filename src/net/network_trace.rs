//! Trace hooks for the network.

use crate::trace::{TraceAdapterInfo, TraceEvent, TraceEventKind, TraceNodeInfo};

use super::Network;

impl Network {
    pub(crate) fn trace_push(&mut self, kind: TraceEventKind) {
        let t_ns = self.now().0;
        if let Some(log) = &mut self.trace {
            log.push(TraceEvent { t_ns, kind });
        }
    }

    /// 记录拓扑元信息；没有开启记录时什么也不做。
    pub fn emit_trace_meta(&mut self) {
        if self.trace.is_none() {
            return;
        }
        let nodes = self
            .roles()
            .into_iter()
            .filter_map(|(id, role)| {
                let name = self.node(id).ok()?.name().to_string();
                Some(TraceNodeInfo {
                    id: id.0,
                    name,
                    role,
                })
            })
            .collect::<Vec<_>>();
        let adapters = self
            .adapters()
            .iter()
            .map(|a| TraceAdapterInfo {
                id: a.id().0,
                node: a.owner().0,
                name: a.name().to_string(),
                mac: a.mac().to_string(),
                mtu: a.mtu(),
                address: self
                    .node(a.owner())
                    .ok()
                    .and_then(|n| n.base().address_on(a.id()))
                    .map(|addr| addr.to_string()),
                peer: a.peer().map(|p| p.0),
            })
            .collect::<Vec<_>>();
        self.trace_push(TraceEventKind::Meta { nodes, adapters });
    }
}
