//! One value satisfying every outbound port the dispatcher needs.
//!
//! [`AppService::dispatch`](crate::app::service::AppService::dispatch)
//! takes a single `io` argument; this bundles the network, broker and
//! boot adapters behind it by delegation.

use crate::app::ports::{BootPort, BrokerPort, NetworkPort};
use crate::config::Qos;
use crate::error::{ConnectError, NetworkError};

pub struct Platform<N, M, B> {
    pub network: N,
    pub broker: M,
    pub boot: B,
}

impl<N, M, B> Platform<N, M, B> {
    pub fn new(network: N, broker: M, boot: B) -> Self {
        Self {
            network,
            broker,
            boot,
        }
    }
}

impl<N: NetworkPort, M, B> NetworkPort for Platform<N, M, B> {
    fn bring_up(&mut self) -> Result<(), NetworkError> {
        self.network.bring_up()
    }

    fn connect_network(&mut self) -> Result<(), NetworkError> {
        self.network.connect_network()
    }

    fn bring_down(&mut self) -> Result<(), NetworkError> {
        self.network.bring_down()
    }
}

impl<N, M: BrokerPort, B> BrokerPort for Platform<N, M, B> {
    fn connect(&mut self) -> Result<(), ConnectError> {
        self.broker.connect()
    }

    fn disconnect(&mut self) -> Result<(), i32> {
        self.broker.disconnect()
    }

    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<(), i32> {
        self.broker.subscribe(topic, qos)
    }
}

impl<N, M, B: BootPort> BootPort for Platform<N, M, B> {
    fn confirm_image(&mut self) -> Result<(), i32> {
        self.boot.confirm_image()
    }
}
