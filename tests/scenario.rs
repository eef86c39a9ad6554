//! End-to-end: build an association model through the service, query it,
//! infer over it and validate it.

use ontograph::error::{LookupError, OntoError};
use ontograph::graph::{Entity, Literal, Term};
use ontograph::infer::{RuleEngine, RuleEngineConfig, ViolationResource};
use ontograph::iri::Iri;
use ontograph::query::PatternQuery;
use ontograph::service::{Service, ServiceConfig};
use ontograph::store::GraphStore;

const SELECT_ALL: &str = "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }";

const CURRENT_PARTICIPANTS: &str = r#"
SELECT DISTINCT ?who WHERE {
  ?association onto:memberOfKind $kind .
  FILTER NOT EXISTS { ?association onto:ending ?end }
  ?participant onto:participantIn ?association ;
               onto:participantOf ?who .
}
ORDER BY ?who
"#;

fn iri(s: &str) -> Iri {
    Iri::new(format!("http://example.org/scenario/{s}")).unwrap()
}

struct Fixture {
    service: Service,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            service: Service::open(&ServiceConfig::default()).unwrap(),
        };
        fixture.load();
        fixture
    }

    fn pred(&self, name: &str) -> Iri {
        self.service.registry().predicate(name).unwrap()
    }

    fn named(&self, type_name: &str, id: &str, name: &str) -> Entity {
        self.service
            .new_entity(type_name, iri(id))
            .unwrap()
            .with(self.pred("name"), Literal::string(name))
    }

    fn participant(&self, id: &str, association: &str, individual: &str, role: &str) -> Entity {
        self.service
            .new_entity("Participant", iri(id))
            .unwrap()
            .with(self.pred("participant_in"), iri(association))
            .with(self.pred("participant_of"), iri(individual))
            .with(self.pred("plays_role"), iri(role))
    }

    fn association(&self, id: &str, kind: &str) -> Entity {
        self.named("Association", id, id)
            .with(self.pred("member_of_kind"), iri(kind))
    }

    fn load(&self) {
        let mut entities = Vec::new();
        for (i, kind) in ["K1", "K2", "K3", "K4"].iter().enumerate() {
            let role = format!("R{}", i + 1);
            entities.push(
                self.named("KindOfAssociation", kind, &format!("kind {kind}"))
                    .with(self.pred("consists_of_by_class"), iri(&role)),
            );
            entities.push(self.named("Role", &role, &format!("role {role}")));
        }
        for (id, name) in [("person1", "Ada"), ("person2", "Brian"), ("person3", "Chen")] {
            entities.push(self.named("Person", id, name));
        }
        for (id, name) in [("system1", "Ledger"), ("system2", "Mailer")] {
            entities.push(self.named("System", id, name));
        }

        entities.push(self.association("A1", "K1"));
        entities.push(self.association("A2", "K1"));
        entities.push(
            self.association("A3", "K1")
                .with(self.pred("ending"), iri("T-end")),
        );
        entities.push(self.association("A4", "K2"));
        entities.push(
            self.service
                .new_entity("PointInTime", iri("T-end"))
                .unwrap()
                .with(self.pred("value"), Literal::date_time("2020-01-01T00:00:00Z")),
        );

        for (id, association, individual, role) in [
            ("P1", "A1", "person1", "R1"),
            ("P2", "A1", "system1", "R2"),
            ("P3", "A2", "person2", "R1"),
            ("P4", "A2", "system2", "R2"),
            ("P5", "A3", "person3", "R1"),
            ("P6", "A3", "system1", "R2"),
            ("P7", "A4", "person1", "R3"),
            ("P8", "A4", "system2", "R4"),
        ] {
            entities.push(self.participant(id, association, individual, role));
        }

        let t = self.service.create_transformation(&entities).unwrap();
        let applied = self.service.apply(&t).unwrap();
        assert_eq!(applied.stats.created, entities.len());
    }
}

#[test]
fn current_participants_of_kind() {
    let fixture = Fixture::new();
    let service = &fixture.service;

    let query = PatternQuery::new(CURRENT_PARTICIPANTS)
        .bind("kind", iri("K1"))
        .unwrap();
    let rows = service.query_template(&query).unwrap();
    assert_eq!(rows.len(), 4);

    let participants: Vec<Entity> = rows
        .iter()
        .map(|row| service.get(row.iri("who").unwrap()).unwrap().unwrap())
        .collect();
    let people = participants
        .iter()
        .filter(|e| service.registry().view_as(e, "Person").is_some())
        .count();
    assert_eq!(people, 2);
    assert!(
        participants
            .iter()
            .all(|e| service.registry().view_as(e, "PhysicalObject").is_some())
    );
}

#[test]
fn lookup_by_name() {
    let fixture = Fixture::new();
    let service = &fixture.service;

    let found = service.find_by_entity_names(&["Mailer", "Ada"]).unwrap();
    assert_eq!(found[0].id(), &iri("system2"));
    assert_eq!(found[1].id(), &iri("person1"));

    let ada = service.registry().view_as(&found[1], "Person").unwrap();
    assert_eq!(ada.name(), Some("Ada"));

    assert!(matches!(
        service.find_by_entity_name("Nobody"),
        Err(OntoError::Lookup(LookupError::NotFound { .. }))
    ));
}

#[test]
fn ambiguous_name_is_reported_not_defaulted() {
    let fixture = Fixture::new();
    let service = &fixture.service;

    let twin = fixture.named("Person", "person4", "Ada");
    service
        .apply(&service.create_transformation(&[twin]).unwrap())
        .unwrap();

    match service.find_by_entity_name("Ada") {
        Err(OntoError::Lookup(LookupError::Ambiguous { count, matches, .. })) => {
            assert_eq!(count, 2);
            assert_eq!(matches.len(), 2);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn inference_reaches_fixed_point() {
    let fixture = Fixture::new();
    let service = &fixture.service;

    let rules = service
        .parse_rules(
            r#"
@rule part-of-transitive derive
  match: (?a onto:partOf ?b), (?b onto:partOf ?c)
  produce: (?a onto:partOf ?c)
"#,
            "inline",
        )
        .unwrap();

    let part_of = fixture.pred("part_of");
    let chain = vec![
        Entity::new(iri("wheel")).with(part_of.clone(), iri("axle")),
        Entity::new(iri("axle")).with(part_of.clone(), iri("car")),
    ];
    service
        .apply(&service.create_transformation(&chain).unwrap())
        .unwrap();

    let before = service.store().statements().unwrap();
    let outcome = service
        .apply_inference_rules(SELECT_ALL, &rules, false)
        .unwrap();
    assert_eq!(outcome.derived.len(), 1);
    assert_eq!(outcome.derived[0].statement.subject, iri("wheel"));
    assert_eq!(outcome.derived[0].statement.object, Term::from(iri("car")));

    let wheel = outcome.store.get(&iri("wheel")).unwrap().unwrap();
    assert!(wheel.contains(&part_of, &iri("car").into()));
    assert!(wheel.contains(&part_of, &iri("axle").into()));

    // The source store is untouched.
    assert_eq!(service.store().statements().unwrap(), before);

    let second = RuleEngine::new(RuleEngineConfig::default())
        .infer(&outcome.store, SELECT_ALL, &rules, &[])
        .unwrap();
    assert!(second.derived.is_empty());
}

#[test]
fn schema_statements_drive_type_inference() {
    let fixture = Fixture::new();
    let service = &fixture.service;

    let rules = service
        .parse_rules(
            r#"
@rule subclass derive
  match: (?x a ?c), (?c rdfs:subClassOf ?d)
  produce: (?x a ?d)
"#,
            "inline",
        )
        .unwrap();

    let outcome = service.apply_inference_rules(SELECT_ALL, &rules, true).unwrap();
    let ada = outcome.store.get(&iri("person1")).unwrap().unwrap();
    let types = service.registry().types_of(&ada);
    let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
    for expected in ["Person", "PhysicalObject", "Individual", "State", "Thing"] {
        assert!(names.contains(&expected), "missing {expected} in {names:?}");
    }
}

#[test]
fn validation_reports_violations_as_data() {
    let fixture = Fixture::new();
    let service = &fixture.service;

    let rules = service
        .parse_rules(
            r#"
@rule participant-needs-role violation MissingRole
  match: (?p a onto:Participant)
  absent: (?p onto:playsRole ?r)
  message: "participant ?p plays no role"
  resource: ?p
"#,
            "inline",
        )
        .unwrap();

    let report = service.validate(SELECT_ALL, &rules, false).unwrap();
    assert!(report.is_valid());

    let roleless = service
        .new_entity("Participant", iri("P9"))
        .unwrap()
        .with(fixture.pred("participant_in"), iri("A1"))
        .with(fixture.pred("participant_of"), iri("person3"));
    service
        .apply(&service.create_transformation(&[roleless]).unwrap())
        .unwrap();
    let before = service.store().statements().unwrap();

    let report = service.validate(SELECT_ALL, &rules, false).unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.entries[0].violation_type, "MissingRole");
    assert_eq!(report.entries[0].resource, ViolationResource::Iri(iri("P9")));
    assert_eq!(service.store().statements().unwrap(), before);
}
