//! Sheet layouts and the field projections that fill them.

use serde_json::{Map, Value};

/// One spreadsheet column: header text, source field path and width.
///
/// Paths use dots for nested objects and `[n]` for array positions, e.g.
/// `proposta.repasses[0].produtor.nome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub header: &'static str,
    pub path: &'static str,
    pub width: u16,
}

const fn column(header: &'static str, path: &'static str, width: u16) -> Column {
    Column {
        header,
        path,
        width,
    }
}

/// A named worksheet and its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub name: &'static str,
    pub columns: &'static [Column],
}

pub const PRODUCTION_SHEET: SheetLayout = SheetLayout {
    name: "Produção",
    columns: &[
        column("ID Proposta", "propostaId", 15),
        column("Data Vigência Inicial", "dataVigenciaInicial", 20),
        column("Data Vigência Final", "dataVigenciaFinal", 20),
        column("Data Emitida", "dataEmitida", 20),
        column("Nível", "nivelLabel", 15),
        column("Tipo", "tipoLabel", 20),
        column("Status", "statusLabel", 20),
        column("Comissão", "comissao", 15),
        column("Prêmio Líquido", "premioLiquido", 18),
        column("Prêmio Total", "premioTotal", 18),
        column("Parcelas", "parcelas", 10),
        column("Nome Corretor", "corretores[0].nome", 30),
        column("Nome Segurado", "segurado.nome", 30),
        column("Tipo Pessoa", "segurado.tipoPessoaLabel", 15),
        column("Sexo Segurado", "segurado.sexoLabel", 15),
        column("Ramo", "ramo.nome", 20),
        column("Seguradora", "companhia.nome", 30),
    ],
};

pub const CLAIMS_SHEET: SheetLayout = SheetLayout {
    name: "Sinistros",
    columns: &[
        column("ID Sinistro", "sinistroId", 15),
        column("Valor Indenizado", "valorIndenizado", 18),
        column("Data Aviso", "dataAviso", 20),
        column("Data Sinistro", "dataSinistro", 20),
        column("Data Vistoria", "dataVistoria", 20),
        column("Data Pagamento", "dataPagamento", 20),
        column("Data Autorização Reparos", "dataAutorizacaoReparos", 25),
        column("Data Envio NF", "dataEnvioNF", 20),
        column("Data Documentação", "dataDocumentacao", 22),
        column("Corretor", "proposta.corretores[0].nome", 30),
        column("Seguradora", "companhia.nome", 30),
        column("Segurado", "proposta.segurado.nome", 35),
        column("CPF/CNPJ", "proposta.segurado.cpf_cnpj", 18),
        column("Status", "statusSinistro.nome", 20),
        column("Ramo", "proposta.ramo.nome", 20),
        column("Produtor", "proposta.repasses[0].produtor.nome", 30),
        column("Tipo", "tipo.nome", 25),
    ],
};

pub const TICKETS_SHEET: SheetLayout = SheetLayout {
    name: "Assistências Urgentes",
    columns: &[
        column("ID", "id", 12),
        column("Título", "titulo", 50),
        column("Solicitante", "solicitante.nome", 30),
        column("Responsável", "responsavel.nome", 30),
        column("Unidade", "unidade.nome", 25),
        column("Departamento", "departamento.nome", 25),
        column("Data Abertura", "aberto", 20),
        column("Situação", "situacao", 15),
        column("Primeira Interação", "primeiraInteracao", 20),
        column("Última Alteração", "ultimaAlteracao", 20),
    ],
};

/// Walks `path` through nested objects and arrays.
pub fn lookup<'a>(record: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut map = record;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let value = resolve(map, segment)?;
        if segments.peek().is_none() {
            return Some(value);
        }
        map = value.as_object()?;
    }
    None
}

fn resolve<'a>(map: &'a Map<String, Value>, segment: &str) -> Option<&'a Value> {
    let (key, indices) = match segment.find('[') {
        Some(position) => segment.split_at(position),
        None => (segment, ""),
    };

    let mut current = map.get(key)?;
    for index in indices
        .split(']')
        .filter_map(|part| part.strip_prefix('['))
    {
        let index: usize = index.parse().ok()?;
        current = current.as_array()?.get(index)?;
    }
    Some(current)
}

/// Value written into one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Projects a field into a cell. Absent, `null`, empty, zero and `false`
    /// values all render as an empty cell.
    pub fn project(record: &Map<String, Value>, path: &str) -> Self {
        match lookup(record, path) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Self::Empty,
            Some(Value::String(text)) if text.is_empty() => Self::Empty,
            Some(Value::String(text)) => Self::Text(text.clone()),
            Some(Value::Number(number)) => match number.as_f64() {
                Some(value) if value == 0.0 => Self::Empty,
                Some(value) => Self::Number(value),
                None => Self::Text(number.to_string()),
            },
            Some(Value::Bool(true)) => Self::Text(String::from("true")),
            Some(other) => Self::Text(other.to_string()),
        }
    }
}
