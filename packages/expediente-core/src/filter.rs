//! Filtro da lista de pacientes por nome

use crate::models::Patient;

/// Registros que podem ser filtrados pelo nome completo
pub trait HasFullName {
    fn full_name(&self) -> &str;
}

impl HasFullName for Patient {
    fn full_name(&self) -> &str {
        &self.full_name
    }
}

impl<T: HasFullName + ?Sized> HasFullName for &T {
    fn full_name(&self) -> &str {
        (**self).full_name()
    }
}

/// Mantém os registros cujo nome contém a busca, sem diferenciar
/// maiúsculas
///
/// A busca é aparada antes da comparação; vazia devolve tudo na ordem
/// original. Aceita uma fatia (`patients.iter()`) ou os valores de um mapa.
pub fn filter_by_name<'a, T, I>(records: I, query: &str) -> Vec<&'a T>
where
    T: HasFullName + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let needle = query.trim().to_lowercase();
    records
        .into_iter()
        .filter(|record| needle.is_empty() || record.full_name().to_lowercase().contains(&needle))
        .collect()
}
