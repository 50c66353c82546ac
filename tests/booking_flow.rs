//! Reservation and admission flow against the in-memory store.
//!
//! Run with: `cargo test --test booking_flow`

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use planetarium_booking::models::DomeGeometry;
use planetarium_booking::services::{admit, AdmissionError, BookingService, SeatRequest};
use planetarium_booking::storage::{BookingStore, BookingTx, MemoryBookingStore};

const SESSION: i64 = 1;
const OTHER_SESSION: i64 = 2;
const USER: i64 = 42;

// Купол 5 рядов по 10 мест, вместимость 50
fn setup() -> (MemoryBookingStore, BookingService) {
    let store = MemoryBookingStore::new();
    store.add_session(SESSION, DomeGeometry::new(5, 10));
    store.add_session(OTHER_SESSION, DomeGeometry::new(3, 4));
    let service = BookingService::new(Arc::new(store.clone()));
    (store, service)
}

fn seat(row: i32, seat: i32) -> SeatRequest {
    SeatRequest::new(row, seat, SESSION)
}

#[tokio::test]
async fn reservation_with_two_tickets_is_created() {
    let (store, service) = setup();

    let booked = service
        .create_reservation(USER, &[seat(1, 1), seat(2, 2)])
        .await
        .unwrap();

    assert_eq!(booked.reservation.user_id, USER);
    assert_eq!(booked.tickets.len(), 2);
    assert!(booked.tickets.iter().all(|t| t.reservation_id == booked.reservation.id));
    assert_eq!((booked.tickets[0].row, booked.tickets[0].seat), (1, 1));
    assert_eq!((booked.tickets[1].row, booked.tickets[1].seat), (2, 2));
    assert_eq!(store.reservation_count(), 1);
    assert_eq!(store.ticket_count(), 2);
}

#[tokio::test]
async fn same_seat_is_admitted_once() {
    let (store, service) = setup();

    service.create_reservation(USER, &[seat(1, 1)]).await.unwrap();
    let err = service.create_reservation(USER + 1, &[seat(1, 1)]).await.unwrap_err();

    assert!(matches!(
        err,
        AdmissionError::SeatTaken { session_id: SESSION, row: 1, seat: 1 }
    ));
    assert_eq!(store.reservation_count(), 1);
    assert_eq!(store.ticket_count(), 1);
}

#[tokio::test]
async fn same_seat_in_another_session_is_free() {
    let (store, service) = setup();

    service.create_reservation(USER, &[seat(1, 1)]).await.unwrap();
    service
        .create_reservation(USER, &[SeatRequest::new(1, 1, OTHER_SESSION)])
        .await
        .unwrap();

    assert_eq!(store.ticket_count(), 2);
}

#[tokio::test]
async fn out_of_range_rows_and_seats_are_rejected() {
    let (store, service) = setup();

    for (request, field) in [
        (seat(0, 1), "row"),
        (seat(6, 1), "row"),
        (seat(1, 0), "seat"),
        (seat(1, 11), "seat"),
    ] {
        let err = service.create_reservation(USER, &[request]).await.unwrap_err();
        match err {
            AdmissionError::OutOfRange(e) => assert_eq!(e.field(), field, "{request:?}"),
            other => panic!("expected OutOfRange for {request:?}, got {other:?}"),
        }
    }

    assert_eq!(store.reservation_count(), 0);
    assert_eq!(store.ticket_count(), 0);
}

#[tokio::test]
async fn empty_reservation_is_rejected_before_persistence() {
    let (store, service) = setup();

    let err = service.create_reservation(USER, &[]).await.unwrap_err();

    assert!(matches!(err, AdmissionError::EmptyReservation));
    assert_eq!(store.reservation_count(), 0);
}

#[tokio::test]
async fn duplicate_seat_within_one_batch_rolls_back_everything() {
    let (store, service) = setup();

    let err = service
        .create_reservation(USER, &[seat(1, 1), seat(1, 1)])
        .await
        .unwrap_err();

    assert!(matches!(err, AdmissionError::SeatTaken { row: 1, seat: 1, .. }));
    assert_eq!(store.reservation_count(), 0);
    assert_eq!(store.ticket_count(), 0);
}

#[tokio::test]
async fn late_failure_discards_earlier_tickets_of_the_batch() {
    let (store, service) = setup();

    let err = service
        .create_reservation(USER, &[seat(1, 1), seat(2, 5), seat(9, 9)])
        .await
        .unwrap_err();

    assert!(matches!(err, AdmissionError::OutOfRange(_)));
    assert_eq!(store.reservation_count(), 0);
    assert_eq!(store.ticket_count(), 0);

    // места из откатившейся брони снова свободны
    service.create_reservation(USER, &[seat(1, 1), seat(2, 5)]).await.unwrap();
    assert_eq!(store.ticket_count(), 2);
}

#[tokio::test]
async fn first_failure_is_reported() {
    let (_store, service) = setup();
    service.create_reservation(USER, &[seat(3, 3)]).await.unwrap();

    let err = service
        .create_reservation(USER, &[seat(3, 3), seat(0, 1)])
        .await
        .unwrap_err();

    assert!(matches!(err, AdmissionError::SeatTaken { row: 3, seat: 3, .. }));
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let (store, service) = setup();

    let err = service
        .create_reservation(USER, &[SeatRequest::new(1, 1, 999)])
        .await
        .unwrap_err();

    assert!(matches!(err, AdmissionError::SessionNotFound(999)));
    assert_eq!(store.reservation_count(), 0);
}

#[tokio::test]
async fn availability_tracks_capacity_minus_tickets() {
    let (store, service) = setup();
    assert_eq!(service.available_seats(SESSION).await.unwrap(), Some(50));

    let batches: [&[SeatRequest]; 3] = [
        &[seat(1, 1)],
        &[seat(1, 2), seat(1, 3), seat(5, 10)],
        &[seat(4, 4), seat(4, 4)], // rejected as a whole
    ];
    for batch in batches {
        let _ = service.create_reservation(USER, batch).await;
        let sold = store.tickets_for_session(SESSION).len() as i64;
        assert_eq!(service.available_seats(SESSION).await.unwrap(), Some(50 - sold));
    }

    assert_eq!(service.available_seats(SESSION).await.unwrap(), Some(46));
}

#[tokio::test]
async fn availability_is_idempotent_without_writes() {
    let (_store, service) = setup();
    service.create_reservation(USER, &[seat(2, 2)]).await.unwrap();

    let first = service.available_seats(SESSION).await.unwrap();
    let second = service.available_seats(SESSION).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, Some(49));
}

#[tokio::test]
async fn availability_of_unknown_session_is_none() {
    let (_store, service) = setup();
    assert_eq!(service.available_seats(999).await.unwrap(), None);
}

#[tokio::test]
async fn deleting_a_reservation_frees_its_seats() {
    let (store, service) = setup();
    let booked = service
        .create_reservation(USER, &[seat(1, 1), seat(1, 2)])
        .await
        .unwrap();
    assert_eq!(service.available_seats(SESSION).await.unwrap(), Some(48));

    assert!(store.delete_reservation(booked.reservation.id));

    assert_eq!(service.available_seats(SESSION).await.unwrap(), Some(50));
    service.create_reservation(USER, &[seat(1, 1)]).await.unwrap();
}

#[tokio::test]
async fn admit_claims_a_seat_once_per_session() {
    let (store, _service) = setup();

    let mut tx = store.begin().await.unwrap();
    let reservation = tx.insert_reservation(USER).await.unwrap();
    let ticket = admit(&mut *tx, seat(1, 1), &reservation).await.unwrap();
    assert_eq!(ticket.reservation_id, reservation.id);
    assert_eq!(ticket.show_session_id, SESSION);
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let reservation = tx.insert_reservation(USER + 1).await.unwrap();
    let err = admit(&mut *tx, seat(1, 1), &reservation).await.unwrap_err();
    assert!(matches!(err, AdmissionError::SeatTaken { .. }));
    tx.rollback().await.unwrap();

    assert_eq!(store.ticket_count(), 1);
    assert_eq!(store.reservation_count(), 1);
}
