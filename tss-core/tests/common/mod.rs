//! Shared in-process transport for driving a set of homogeneous
//! [`key_share::session::Protocol`] instances to completion without a real
//! network: every party's outbound messages for a round are collected and
//! handed to every other party's `handle_round` before the next round
//! starts, exactly as an external coordinator following the ordering
//! guarantees in the data model would.

use key_share::session::{OutMsg, Protocol, StepOutcome};

/// Runs `parties` (one [`Protocol`] instance per local party, indices
/// matching their position in the vector) to completion and returns each
/// party's final output in the same order.
pub fn run_protocol<P: Protocol>(mut parties: Vec<P>) -> Vec<P::Output> {
    let n = parties.len();
    let mut outgoing: Vec<Vec<OutMsg<P::Message>>> = parties
        .iter_mut()
        .map(|p| p.start().expect("start"))
        .collect();
    let mut outputs: Vec<Option<P::Output>> = (0..n).map(|_| None).collect();
    let mut round = 0u16;

    loop {
        let mut inbound: Vec<Vec<(u16, P::Message)>> = (0..n).map(|_| Vec::new()).collect();
        for (sender, msgs) in outgoing.iter().enumerate() {
            for m in msgs {
                match m.recipient {
                    None => {
                        for recipient in 0..n {
                            if recipient != sender {
                                inbound[recipient].push((sender as u16, m.payload.clone()));
                            }
                        }
                    }
                    Some(r) => inbound[usize::from(r)].push((sender as u16, m.payload.clone())),
                }
            }
        }

        let mut next_outgoing: Vec<Vec<OutMsg<P::Message>>> = (0..n).map(|_| Vec::new()).collect();
        for i in 0..n {
            if outputs[i].is_some() {
                continue;
            }
            let messages = std::mem::take(&mut inbound[i]);
            match parties[i].handle_round(round, messages).expect("handle_round") {
                StepOutcome::Continue(msgs) => next_outgoing[i] = msgs,
                StepOutcome::Done(out) => outputs[i] = Some(out),
            }
        }
        outgoing = next_outgoing;
        round += 1;

        if outputs.iter().all(Option::is_some) {
            break;
        }
    }

    outputs.into_iter().map(|o| o.expect("collected above")).collect()
}
