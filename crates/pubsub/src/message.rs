/// A message pulled from a subscription.
///
/// Transports (Pub/Sub clients, the in-memory broker) implement this so the
/// router never depends on a concrete client library.
pub trait InboundMessage {
    /// Raw payload bytes.
    fn data(&self) -> &[u8];

    /// Acknowledge receipt so the transport does not redeliver.
    fn ack(&self);
}

impl<M: InboundMessage + ?Sized> InboundMessage for &M {
    fn data(&self) -> &[u8] {
        (**self).data()
    }

    fn ack(&self) {
        (**self).ack()
    }
}
