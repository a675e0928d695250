//! Query domains and the operations each one exposes through the contract.

use serde::{de::DeserializeOwned, Serialize};

/// A query namespace on the contract, used as the outer envelope key.
pub trait Domain: Send + Sync + 'static {
    const NAME: &'static str;
}

/// A query the contract answers. The set of impls for a domain is that
/// domain's operation table.
pub trait ContractOperation {
    type Domain: Domain;

    /// Inner envelope key.
    const NAME: &'static str;

    type Request: Serialize + Send + Sync;
    type Response: DeserializeOwned + Send;
}

#[derive(Debug, Clone, Copy)]
pub struct RollappDomain;

impl Domain for RollappDomain {
    const NAME: &'static str = "rollapp";
}

#[derive(Debug, Clone, Copy)]
pub struct SequencerDomain;

impl Domain for SequencerDomain {
    const NAME: &'static str = "sequencer";
}

macro_rules! contract_operations {
    ($domain:ty => { $($(#[$meta:meta])* $op:ident($name:literal): $req:ty => $resp:ty;)+ }) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy)]
            pub struct $op;

            impl ContractOperation for $op {
                type Domain = $domain;
                const NAME: &'static str = $name;
                type Request = $req;
                type Response = $resp;
            }
        )+
    };
}

pub mod ops {
    //! Operation markers for every query the contract supports.

    use hubclient_types::{rollapp, sequencer};

    use super::{ContractOperation, RollappDomain, SequencerDomain};

    contract_operations!(RollappDomain => {
        /// Latest state index of a rollapp, optionally only finalized ones.
        LatestStateIndexQuery("latestStateIndex"):
            rollapp::QueryGetLatestStateIndexRequest => rollapp::QueryGetLatestStateIndexResponse;
        /// State info by index.
        StateInfoQuery("stateInfo"):
            rollapp::QueryGetStateInfoRequest => rollapp::QueryGetStateInfoResponse;
    });

    contract_operations!(SequencerDomain => {
        /// Every sequencer registered for a rollapp.
        SequencersByRollappQuery("sequencersByRollapp"):
            sequencer::QueryGetSequencersByRollappRequest
                => sequencer::QueryGetSequencersByRollappResponse;
    });
}
